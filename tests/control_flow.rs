#[macro_use]
mod common;

#[cfg(test)]
mod control_flow {
    tests! {
        continue_skips_one in control_flow is OK
        "0"
        "2"
    }

    tests! {
        break_and_continue in control_flow is OK
        "0"
        "1"
        "3"
    }

    tests! {
        break_outside_loop in control_flow is ERR
        "[line 1] Error at 'break': Cannot break outside of a loop"
    }
}
