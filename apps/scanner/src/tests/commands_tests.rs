use super::*;

#[test]
fn blank_lines_are_skipped() {
    assert_eq!(parse_command("   "), Ok(None));
}

#[test]
fn scan_and_toggle_are_aliases() {
    assert_eq!(parse_command("scan"), Ok(Some(Command::Toggle)));
    assert_eq!(parse_command("TOGGLE"), Ok(Some(Command::Toggle)));
}

#[test]
fn gate_command_parses_direction() {
    assert_eq!(
        parse_command("gate exit"),
        Ok(Some(Command::SetGate(Gate::Exit)))
    );
    assert_eq!(
        parse_command("gate in"),
        Ok(Some(Command::SetGate(Gate::Entry)))
    );
    assert!(parse_command("gate").is_err());
    assert!(parse_command("gate north").is_err());
}

#[test]
fn qr_keeps_the_raw_payload() {
    assert_eq!(
        parse_command(r#"qr {"permitId":"UC-1","bearer":"Jane Q"}"#),
        Ok(Some(Command::Qr(
            r#"{"permitId":"UC-1","bearer":"Jane Q"}"#.to_string()
        )))
    );
    assert_eq!(
        parse_command("qr UC-2|Juan| |GP-1"),
        Ok(Some(Command::Qr("UC-2|Juan| |GP-1".to_string())))
    );
    assert!(parse_command("qr").is_err());
}

#[test]
fn unknown_verbs_are_reported() {
    assert_eq!(
        parse_command("launch"),
        Err("unknown command 'launch'".to_string())
    );
}

#[test]
fn quit_aliases() {
    for line in ["quit", "q"] {
        assert_eq!(parse_command(line), Ok(Some(Command::Quit)));
    }
}
