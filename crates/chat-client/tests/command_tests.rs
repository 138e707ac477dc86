use chat_client::{parse_line, Command, CommandError};
use chat_core::MessageKind;

#[test]
fn plain_text_is_a_public_message() {
    assert_eq!(
        parse_line("  hello there  ").unwrap(),
        Some(Command::Say("hello there".to_string()))
    );
    assert_eq!(parse_line("   ").unwrap(), None);
}

#[test]
fn private_command_splits_name_and_text() {
    assert_eq!(
        parse_line("/p bob see you at   five").unwrap(),
        Some(Command::Private {
            to: "bob".to_string(),
            text: "see you at   five".to_string(),
        })
    );
    assert_eq!(parse_line("/p bob"), Err(CommandError::PrivateUsage));
    assert_eq!(parse_line("/p"), Err(CommandError::PrivateUsage));
}

#[test]
fn spanish_and_english_aliases() {
    for (line, expected) in [
        ("/usuarios", Command::ListUsers),
        ("/users", Command::ListUsers),
        ("/salir", Command::Quit),
        ("/quit", Command::Quit),
        ("/ayuda", Command::Help),
        ("/help", Command::Help),
    ] {
        assert_eq!(parse_line(line).unwrap(), Some(expected), "{line}");
    }
}

#[test]
fn unknown_commands_are_not_sent_as_text() {
    assert_eq!(
        parse_line("/kick bob"),
        Err(CommandError::Unknown("/kick".to_string()))
    );
}

#[test]
fn commands_become_messages_from_me() {
    let say = Command::Say("hi".to_string()).to_message("alice").unwrap();
    assert_eq!(say.kind(), &MessageKind::Broadcast);
    assert_eq!(say.sender(), "alice");
    assert_eq!(say.content(), "hi");

    let private = Command::Private {
        to: "bob".to_string(),
        text: "psst".to_string(),
    }
    .to_message("alice")
    .unwrap();
    assert_eq!(private.recipient(), Some("bob"));
    assert_eq!(private.content(), "psst");

    assert_eq!(
        Command::ListUsers.to_message("alice").unwrap().kind(),
        &MessageKind::ListUsers
    );
    assert_eq!(
        Command::Quit.to_message("alice").unwrap().kind(),
        &MessageKind::Disconnect
    );
    assert!(Command::Help.to_message("alice").is_none());
}
