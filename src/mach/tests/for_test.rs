use super::*;

#[test]
fn test_breaking_out_of_loop_with_goto() {
    let mut r = program(&[
        "10 FOR Y=1 TO 2",
        "20 FOR X=8 TO 9",
        "30 PRINT Y,X",
        "40 GOTO 60",
        "50 NEXT",
        "60 NEXT Y",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "1 8\n2 8\n");
}

#[test]
fn test_direct_for_loop() {
    let mut r = program(&["FOR I=1 TO 3: PRINT I: NEXT I"]);
    assert_eq!(run(&mut r), "1\n2\n3\n");
}

#[test]
fn test_for_loop_may_run_zero_times() {
    let mut r = program(&["FOR I=3 TO 1: PRINT I: NEXT I: PRINT \"DONE\""]);
    assert_eq!(run(&mut r), "DONE\n");
}

#[test]
fn test_negative_step() {
    let mut r = program(&["FOR I=3 TO 1 STEP -1: PRINT I,: NEXT"]);
    assert_eq!(run(&mut r), "3 2 1 ");
}

#[test]
fn test_nested_loops() {
    let mut r = program(&["FOR I=1 TO 2: FOR J=1 TO 2: PRINT I*10+J,: NEXT: NEXT"]);
    assert_eq!(run(&mut r), "11 12 21 22 ");
}

#[test]
fn test_next_without_for() {
    let mut r = program(&["NEXT"]);
    assert_eq!(run(&mut r), "Loop Error\n");
}

#[test]
fn test_break_leaves_loop() {
    let mut r = program(&[
        "10 FOR I=1 TO 10",
        "20 IF I=3 THEN BREAK",
        "30 PRINT I",
        "40 NEXT",
        "50 PRINT \"OUT\"",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "1\n2\nOUT\n");
}
