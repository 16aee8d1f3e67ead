#[macro_use]
mod common;

#[cfg(test)]
mod classes {
    tests! {
        greet in classes is OK
        "hi x"
    }

    tests! {
        inheritance in classes is OK
        "from A"
        "from B"
    }

    tests! {
        inherit_from_non_class in classes is ERR
        "[line 2] Superclass must be a class"
    }
}
