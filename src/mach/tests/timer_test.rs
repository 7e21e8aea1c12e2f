use super::*;
use std::time::{Duration, Instant};

/// Drive the runtime until it stops or `limit` passes.
fn run_for(r: &mut Runtime, limit: Duration) -> String {
    let start = Instant::now();
    let mut s = String::new();
    while start.elapsed() < limit {
        match r.execute(1000) {
            Event::Stopped => break,
            Event::Print(p) => s.push_str(&p),
            Event::Errors(errors) => {
                for e in errors {
                    s.push_str(&format!("{}\n", e));
                }
            }
            _ => {}
        }
    }
    s
}

#[test]
fn test_after_goto() {
    let mut r = program(&["10 AFTER 5 GOTO 100", "20 GOTO 20", "100 PRINT \"FIRED\"", "RUN"]);
    assert_eq!(run_for(&mut r, Duration::from_secs(5)), "FIRED\n");
}

#[test]
fn test_every_gosub_returns() {
    let mut r = program(&[
        "10 EVERY 1 GOSUB 100",
        "20 IF C<3 THEN 20",
        "30 PRINT C: END",
        "100 C=C+1: RETURN",
        "RUN",
    ]);
    assert_eq!(run_for(&mut r, Duration::from_secs(5)), "3\n");
}

#[test]
fn test_raised_event() {
    let mut r = program(&[
        "10 EVENT 7 GOSUB 100",
        "20 IF C=0 THEN 20",
        "30 PRINT \"DONE\": END",
        "100 C=1: PRINT \"EVENT\": RETURN",
        "RUN",
    ]);
    assert_eq!(r.execute(100), Event::Running);
    assert!(!r.raise_event(9));
    assert!(r.raise_event(7));
    assert_eq!(run(&mut r), "EVENT\nDONE\n");
}

#[test]
fn test_interrupt_stops_program() {
    let mut r = program(&["10 GOTO 10", "RUN"]);
    assert_eq!(r.execute(100), Event::Running);
    r.interrupt();
    assert_eq!(r.execute(100), Event::Print("\n".to_string()));
    assert_eq!(r.execute(100), Event::Stopped);
}

#[test]
fn test_interrupt_wins_over_raised_event() {
    let mut r = program(&["10 EVENT 7 GOSUB 100", "20 GOTO 20", "100 PRINT \"EVENT\": RETURN", "RUN"]);
    assert_eq!(r.execute(100), Event::Running);
    assert!(r.raise_event(7));
    r.interrupt();
    assert_eq!(r.execute(100), Event::Print("\n".to_string()));
    assert_eq!(r.execute(100), Event::Stopped);
}

#[test]
fn test_delay_keeps_running_without_statements() {
    let mut r = program(&["10 T=MILLIS(1)", "20 DELAY 200", "30 PRINT MILLIS(1)-T>=200", "RUN"]);
    assert_eq!(r.execute(1000), Event::Running);
    assert_eq!(r.execute(1000), Event::Running);
    assert_eq!(run_for(&mut r, Duration::from_secs(5)), "-1\n");
}

#[test]
fn test_interrupt_ends_delay() {
    let mut r = program(&["10 DELAY 60000", "20 PRINT \"LATE\"", "RUN"]);
    assert_eq!(r.execute(100), Event::Running);
    r.interrupt();
    assert_eq!(r.execute(100), Event::Print("\n".to_string()));
    assert_eq!(r.execute(100), Event::Stopped);
}

#[test]
fn test_millis_divides() {
    let mut r = program(&["PRINT MILLIS(1)>=MILLIS(1000)"]);
    assert_eq!(run(&mut r), "-1\n");
    r.enter("PRINT MILLIS(0)");
    assert_eq!(run(&mut r), "Div by 0 Error\n");
}
