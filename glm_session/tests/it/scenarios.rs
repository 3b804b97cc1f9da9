use glm_session::{ConversationManager, SessionConfig};

use super::*;

#[test]
fn test_two_friends() -> crate::Result<()> {
    let config = SessionConfig::builder()
        .system_prompt("S")
        .multi_user_list(vec!["alice".to_string(), "bob".to_string()])
        .build();
    let backend = StubBackend::with_replies(["Hello Alice", "Hi Bob", "Not much"]);
    let mut manager = ConversationManager::new(config, backend)?;

    assert_eq!(manager.get_response("hi", Some("alice"), None)?, "Hello Alice");
    assert_eq!(manager.get_response("hey", Some("bob"), None)?, "Hi Bob");
    assert_eq!(manager.get_response("what's new?", Some("alice"), None)?, "Not much");

    assert_eq!(
        manager.history(Some("alice"))?.messages(),
        &[
            Message::system("S"),
            Message::user("hi"),
            Message::assistant("Hello Alice"),
            Message::user("what's new?"),
            Message::assistant("Not much"),
        ]
    );
    assert_eq!(
        manager.history(Some("bob"))?.messages(),
        &[
            Message::system("S"),
            Message::user("hey"),
            Message::assistant("Hi Bob"),
        ]
    );

    // Bob's turn never reaches Alice's prompt.
    let renders = manager.backend().renders.borrow();
    assert!(renders[2].0.iter().all(|m| m.content() != "hey"));

    drop(renders);
    manager.release_chat_memory("alice")?;
    assert_eq!(manager.history(Some("alice"))?.messages(), &[Message::system("S")]);
    assert_eq!(manager.history(Some("bob"))?.len(), 3);
    Ok(())
}

#[test]
fn test_single_user_ignores_id() -> crate::Result<()> {
    let config = SessionConfig::builder().system_prompt("S").build();
    let mut manager = ConversationManager::new(config, StubBackend::with_replies(["one", "two"]))?;

    manager.get_response("first", None, None)?;
    manager.get_response("second", Some("whoever"), None)?;

    let history = manager.history(Some("someone else"))?;
    assert_eq!(history.len(), 5);
    assert_eq!(history.messages()[3], Message::user("second"));
    assert_eq!(history.messages()[4], Message::assistant("two"));
    Ok(())
}

#[test]
fn test_release_after_three_turns() -> crate::Result<()> {
    let config = SessionConfig::builder()
        .system_prompt("S")
        .multi_user_list(vec!["alice".to_string(), "bob".to_string()])
        .build();
    let backend = StubBackend::with_replies(["a1", "b1", "a2", "a3", "a4"]);
    let mut manager = ConversationManager::new(config, backend)?;

    manager.get_response("one", Some("alice"), None)?;
    manager.get_response("hey", Some("bob"), None)?;
    manager.get_response("two", Some("alice"), None)?;
    manager.get_response("three", Some("alice"), None)?;
    assert_eq!(manager.history(Some("alice"))?.len(), 7);

    manager.release_chat_memory("alice")?;
    assert_eq!(manager.history(Some("alice"))?.len(), 1);
    assert_eq!(manager.history(Some("alice"))?.system_prompt(), "S");
    assert_eq!(manager.history(Some("bob"))?.len(), 3);

    // A released user starts over from the system message alone.
    manager.get_response("again", Some("alice"), None)?;
    let renders = manager.backend().renders.borrow();
    let last = &renders.last().unwrap().0;
    assert_eq!(last.len(), 2);
    assert_eq!(last[1], Message::user("again"));
    Ok(())
}
