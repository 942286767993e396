mod common;

use common::{bodies, create_test_app, ADMIN, PARTICIPANT};
use quiz_group_bot::error::REFUSAL_MESSAGE;
use quiz_group_bot::event::start_test_token;
use quiz_group_bot::models::AnswerLetter::A;
use quiz_group_bot::storage::Repository;

#[tokio::test]
async fn admin_commands_are_refused_for_participants() {
    let app = create_test_app();

    for command in ["showtests", "deletetest", "addlink", "dellink", "showlinks", "stats"] {
        let replies = app.command(PARTICIPANT, command, &["1"]).await;
        assert_eq!(bodies(&replies), vec![REFUSAL_MESSAGE], "/{}", command);
    }
}

#[tokio::test]
async fn add_link_registers_a_group() {
    let app = create_test_app();

    let replies = app
        .command(ADMIN, "addlink", &["b3", "https://t.me/+invite", "5"])
        .await;

    assert!(replies[0].body.starts_with("✅ Link added"));
    let groups = app.repo.list_groups(Some('B')).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label, "B3");
    assert_eq!(groups[0].capacity, Some(5));
    assert_eq!(groups[0].current_count, 0);
}

#[tokio::test]
async fn add_link_validates_its_arguments() {
    let app = create_test_app();

    let usage = app.command(ADMIN, "addlink", &["A1"]).await;
    let label = app.command(ADMIN, "addlink", &["group", "https://t.me/x"]).await;
    let capacity = app
        .command(ADMIN, "addlink", &["A1", "https://t.me/x", "0"])
        .await;

    assert!(usage[0].body.contains("/addlink A1"));
    assert!(label[0].body.contains("letter followed by a number"));
    assert_eq!(
        bodies(&capacity),
        vec!["❌ max_users must be a positive number."]
    );
    assert!(app.repo.list_groups(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_link_label_is_refused() {
    let app = create_test_app();
    app.command(ADMIN, "addlink", &["A1", "https://t.me/one"]).await;

    let replies = app.command(ADMIN, "addlink", &["a1", "https://t.me/two"]).await;

    assert_eq!(
        bodies(&replies),
        vec!["❌ A group with this name already exists."]
    );
}

#[tokio::test]
async fn hand_added_group_is_used_for_allocation() {
    let app = create_test_app();
    app.command(ADMIN, "addlink", &["A7", "https://t.me/manual", "1"])
        .await;
    let test = app.seed_test("Algebra", &[A]).await;

    app.callback(PARTICIPANT, &start_test_token(test.id)).await;
    let first = app.callback(PARTICIPANT, "answer:A").await;
    app.callback(PARTICIPANT + 1, &start_test_token(test.id)).await;
    let second = app.callback(PARTICIPANT + 1, "answer:A").await;

    assert!(first[1].body.contains("A group A7."));
    assert!(second[1].body.contains("A group A8."));
}

#[tokio::test]
async fn links_can_be_listed_and_deleted() {
    let app = create_test_app();
    app.command(ADMIN, "addlink", &["A1", "https://t.me/one", "3"])
        .await;
    let id = app.repo.list_groups(None).await.unwrap()[0].id;

    let listing = app.command(ADMIN, "showlinks", &[]).await;
    let deleted = app.command(ADMIN, "dellink", &[id.to_string().as_str()]).await;
    let again = app.command(ADMIN, "dellink", &[id.to_string().as_str()]).await;
    let empty = app.command(ADMIN, "showlinks", &[]).await;

    assert!(listing[0].body.contains("A1"));
    assert!(listing[0].body.contains("(0/3)"));
    assert_eq!(bodies(&deleted), vec!["✅ Link deleted."]);
    assert_eq!(bodies(&again), vec!["❌ Link not found."]);
    assert_eq!(bodies(&empty), vec!["No links found."]);
}

#[tokio::test]
async fn tests_can_be_listed_and_deleted() {
    let app = create_test_app();
    let test = app.seed_test("Algebra", &[A, A]).await;

    let listing = app.command(ADMIN, "showtests", &[]).await;
    let bad_id = app.command(ADMIN, "deletetest", &["abc"]).await;
    let deleted = app
        .command(ADMIN, "deletetest", &[test.id.to_string().as_str()])
        .await;

    assert!(listing[0].body.contains("Algebra (2 questions)"));
    assert_eq!(bodies(&bad_id), vec!["❌ The ID must be an integer."]);
    assert!(deleted[0].body.starts_with("✅ Test"));
    assert!(app.repo.list_tests().await.unwrap().is_empty());
    assert!(app.repo.list_questions(test.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stats_lists_results() {
    let app = create_test_app();
    let empty = app.command(ADMIN, "stats", &[]).await;
    let test = app.seed_test("Algebra", &[A]).await;
    app.callback(PARTICIPANT, &start_test_token(test.id)).await;
    app.callback(PARTICIPANT, "answer:A").await;

    let replies = app.command(ADMIN, "stats", &[]).await;

    assert_eq!(bodies(&empty), vec!["📊 No results yet."]);
    assert!(replies[0].body.contains("User 200"));
    assert!(replies[0].body.contains("1/1, group: A1"));
}

#[tokio::test]
async fn help_shows_admin_section_only_to_admins() {
    let app = create_test_app();

    let admin = app.command(ADMIN, "help", &[]).await;
    let participant = app.command(PARTICIPANT, "help", &[]).await;

    assert!(admin[0].body.contains("/addlink"));
    assert!(!participant[0].body.contains("/addlink"));
    assert!(participant[0].body.contains("/myscore"));
}

#[tokio::test]
async fn group_with_the_last_suffix_degrades_the_next_finisher() {
    let app = create_test_app();
    let last = format!("A{}", u32::MAX);
    app.command(ADMIN, "addlink", &[last.as_str(), "https://t.me/last", "1"])
        .await;
    let test = app.seed_test("Algebra", &[A]).await;

    app.callback(PARTICIPANT, &start_test_token(test.id)).await;
    app.callback(PARTICIPANT, "answer:A").await;
    app.callback(PARTICIPANT + 1, &start_test_token(test.id)).await;
    let replies = app.callback(PARTICIPANT + 1, "answer:A").await;

    assert!(replies[1].body.contains("Result: 1/1"));
    assert!(replies[1].body.contains("No free slot"));
    let results = app.repo.list_results().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].group_id, None);
}

#[tokio::test]
async fn single_questions_can_be_listed_and_deleted() {
    let app = create_test_app();
    let test = app.seed_test("Algebra", &[A, A]).await;
    let first = app.repo.list_questions(test.id).await.unwrap()[0].id;
    let test_id = test.id.to_string();
    let question_id = first.to_string();

    let listing = app.command(ADMIN, "showquestions", &[test_id.as_str()]).await;
    let deleted = app
        .command(ADMIN, "delquestion", &[question_id.as_str()])
        .await;
    let again = app
        .command(ADMIN, "delquestion", &[question_id.as_str()])
        .await;
    let refused = app
        .command(PARTICIPANT, "delquestion", &[question_id.as_str()])
        .await;

    assert!(listing[0].body.contains(&format!("{}) Question 1 [A]", first)));
    assert_eq!(
        bodies(&deleted),
        vec![format!("✅ Question (id={}) deleted from test {}.", first, test.id)]
    );
    assert_eq!(
        bodies(&again),
        vec![format!("❌ Question (id={}) not found.", first)]
    );
    assert_eq!(bodies(&refused), vec![REFUSAL_MESSAGE]);
    let remaining = app.repo.list_questions(test.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].text, "Question 2");
}
