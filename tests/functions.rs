#[macro_use]
mod common;

#[cfg(test)]
mod functions {
    tests! {
        recursion in functions is OK
        "21"
    }

    tests! {
        arity_mismatch in functions is ERR
        "[line 4] Expected 2 arguments but got 1"
    }
}
