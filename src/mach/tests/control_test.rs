use super::*;

#[test]
fn test_while_false_on_entry() {
    let mut r = program(&["10 WHILE 0: PRINT 1: WEND: PRINT 2", "RUN"]);
    assert_eq!(run(&mut r), "2\n");
}

#[test]
fn test_while_counts() {
    let mut r = program(&["10 I=0", "20 WHILE I<3", "30 I=I+1: PRINT I", "40 WEND", "RUN"]);
    assert_eq!(run(&mut r), "1\n2\n3\n");
}

#[test]
fn test_repeat_until() {
    let mut r = program(&["10 I=0", "20 REPEAT", "30 I=I+1", "40 UNTIL I=3", "50 PRINT I", "RUN"]);
    assert_eq!(run(&mut r), "3\n");
}

#[test]
fn test_gosub_returns_mid_line() {
    let mut r = program(&["10 GOSUB 100: PRINT 2: END", "100 PRINT 1: RETURN", "RUN"]);
    assert_eq!(run(&mut r), "1\n2\n");
}

#[test]
fn test_return_without_gosub() {
    let mut r = program(&["RETURN"]);
    assert_eq!(run(&mut r), "RETURN Error\n");
}

#[test]
fn test_gosub_overflow_keeps_arena() {
    let mut r = program(&["10 GOSUB 10"]);
    let top = r.arena.top();
    let himem = r.arena.himem();
    r.enter("RUN");
    assert_eq!(run(&mut r), "10: GOSUB Error\n");
    assert_eq!(r.arena.top(), top);
    assert_eq!(r.arena.himem(), himem);
}

#[test]
fn test_switch_falls_into_matching_case() {
    let mut r = program(&[
        "10 X=2",
        "20 SWITCH X",
        "30 CASE 1: PRINT \"ONE\"",
        "40 CASE 2,3: PRINT \"TWO\"",
        "50 CASE 4: PRINT \"FOUR\"",
        "60 SWEND",
        "70 PRINT \"END\"",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "TWO\nEND\n");
}

#[test]
fn test_switch_skips_nested_cases() {
    let mut r = program(&[
        "10 X=2",
        "20 SWITCH X",
        "30 CASE 1: SWITCH 5",
        "40 CASE 2: PRINT \"INNER\"",
        "50 SWEND",
        "60 CASE 2: PRINT \"TWO\"",
        "70 SWEND",
        "80 PRINT \"END\"",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "TWO\nEND\n");
}

#[test]
fn test_if_then_else() {
    let mut r = program(&["IF 0 THEN PRINT 1 ELSE PRINT 2"]);
    assert_eq!(run(&mut r), "2\n");
    r.enter("IF 1 THEN PRINT 1 ELSE PRINT 2");
    assert_eq!(run(&mut r), "1\n");
    r.enter("IF 0 THEN PRINT 1: PRINT 3");
    assert_eq!(run(&mut r), "");
}

#[test]
fn test_then_line_number() {
    let mut r = program(&["10 IF 1 THEN 30", "20 PRINT 20", "30 PRINT 30", "RUN"]);
    assert_eq!(run(&mut r), "30\n");
}

#[test]
fn test_read_data_restore() {
    let mut r = program(&[
        "10 DATA 1,2,\"X\"",
        "20 READ A,B,C$",
        "30 PRINT A+B;C$",
        "40 RESTORE: READ D: PRINT D",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "3X\n1\n");
}

#[test]
fn test_read_past_data_sets_status() {
    let mut r = program(&["10 DATA 5", "20 READ A,B: PRINT A,B,@S", "RUN"]);
    assert_eq!(run(&mut r), "5 0 1\n");
}

#[test]
fn test_inline_function() {
    let mut r = program(&["10 DEF FN F(X)=X*X", "20 PRINT FN F(3)+X", "RUN"]);
    assert_eq!(run(&mut r), "9\n");
}

#[test]
fn test_recursive_function() {
    let mut r = program(&[
        "10 DEF FN G(N)",
        "20 IF N<2 THEN RETURN 1",
        "30 RETURN N*FN G(N-1)",
        "40 FEND",
        "50 PRINT FN G(5)",
        "RUN",
    ]);
    assert_eq!(run(&mut r), "120\n");
}

#[test]
fn test_runaway_recursion_is_function_error() {
    let mut r = program(&["10 DEF FN R(N)=FN R(N+1)", "20 PRINT FN R(1)", "RUN"]);
    let out = run(&mut r);
    assert!(out.ends_with(": Function Error\n"), "{}", out);
    assert_eq!(r.fn_depth, 0);
    r.enter("PRINT 1");
    assert_eq!(run(&mut r), "1\n");
}

#[test]
fn test_print_width_is_bounded() {
    let mut r = program(&["PRINT #-3E9,1"]);
    assert_eq!(run(&mut r), format!("{:>255}\n", "1"));
    r.enter("PRINT #3E9,1;\"|\"");
    assert_eq!(run(&mut r), format!("{:<255}|\n", "1"));
    r.enter("PRINT #3,12");
    assert_eq!(run(&mut r), "12 \n");
}

#[test]
fn test_tab_is_bounded() {
    let mut r = program(&["TAB 1E12: PRINT \"X\""]);
    assert_eq!(run(&mut r), format!("{}X\n", " ".repeat(255)));
}

#[test]
fn test_string_assignment() {
    let mut r = program(&["A$=\"HELLO\": B$=A$+\" WORLD\": PRINT B$: PRINT LEN(B$)"]);
    assert_eq!(run(&mut r), "HELLO WORLD\n11\n");
    r.enter("PRINT A$(2,3)");
    assert_eq!(run(&mut r), "EL\n");
}

#[test]
fn test_input_numbers() {
    let mut r = program(&["INPUT A,B: PRINT A+B"]);
    r.queue_input("3,4");
    assert_eq!(run(&mut r), "? 7\n");
}

#[test]
fn test_input_string_with_prompt() {
    let mut r = program(&["INPUT \"NAME\",N$: PRINT \"HI \";N$"]);
    r.queue_input("BOB");
    assert_eq!(run(&mut r), "NAMEHI BOB\n");
}

#[test]
fn test_input_at_end_of_input_stops() {
    let mut r = program(&["10 INPUT A", "20 PRINT \"NO\"", "RUN"]);
    assert_eq!(run(&mut r), "? ");
}
