use super::*;

#[test]
fn test_on_error_goto_fires_once() {
    let mut r = program(&[
        "10 ON ERROR GOTO 100",
        "20 X=1/0",
        "30 PRINT \"NO\"",
        "100 PRINT ERROR: X=1/0",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "12\n100: Div by 0 Error\n");
}

#[test]
fn test_error_cont_skips_statement() {
    let mut r = program(&["10 ERROR CONT", "20 X=1/0: PRINT \"NEXT\"", "30 PRINT ERROR", "RUN"]);
    assert_eq!(run(&mut r), "NEXT\n12\n");
}

#[test]
fn test_unhandled_error_reports_line() {
    let mut r = program(&["10 PRINT 1", "20 X=1/0", "30 PRINT 2", "RUN"]);
    assert_eq!(run(&mut r), "1\n20: Div by 0 Error\n");
}

#[test]
fn test_direct_errors_survive() {
    let mut r = Runtime::default();
    r.enter("PRINT 1/0");
    assert_eq!(run(&mut r), "Div by 0 Error\n");
    r.enter("GOTO 50");
    assert_eq!(run(&mut r), "Unknown Line Error\n");
    r.enter("PRINT 5");
    assert_eq!(run(&mut r), "5\n");
}

#[test]
fn test_handler_is_only_for_programs() {
    let mut r = program(&["ERROR GOTO 100"]);
    assert_eq!(run(&mut r), "");
    r.enter("X=1/0");
    assert_eq!(run(&mut r), "Div by 0 Error\n");
}

#[test]
fn test_bad_line_number() {
    let mut r = Runtime::default();
    r.enter("70000 PRINT");
    assert_eq!(run(&mut r), "Range Error\n");
    assert_eq!(r.listing(), "");
}
