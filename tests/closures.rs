#[macro_use]
mod common;

#[cfg(test)]
mod closures {
    tests! {
        counter in closures is OK
        "1"
        "2"
        "3"
    }

    tests! {
        lexical_capture in closures is OK
        "global"
        "global"
    }
}
