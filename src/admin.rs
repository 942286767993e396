use std::collections::HashMap;

use crate::app::{App, MENU_ADD_LINK, MENU_NEW_TEST, MENU_SCORE, MENU_START, MENU_STOP};
use crate::error::{BotError, BotResult};
use crate::event::{Buttons, OutboundMessage};
use crate::models::{parse_label, Group, NewGroup};

pub const ADD_LINK_USAGE: &str = "To add a link: /addlink A1 https://t.me/... [max_users]";

pub fn require_admin(app: &App, user_id: i64) -> BotResult<()> {
    if app.config().is_admin(user_id) {
        Ok(())
    } else {
        Err(BotError::Unauthorized)
    }
}

pub fn main_menu(is_admin: bool) -> Buttons {
    let mut rows = vec![
        vec![MENU_START.to_string()],
        vec![MENU_SCORE.to_string(), MENU_STOP.to_string()],
    ];
    if is_admin {
        rows.push(vec![MENU_NEW_TEST.to_string()]);
        rows.push(vec![MENU_ADD_LINK.to_string()]);
    }
    Buttons::Menu(rows)
}

const PARTICIPANT_HELP: [&str; 3] = [
    "/start – choose a test",
    "/myscore – your score and group",
    "/cancel – stop the current test",
];

const ADMIN_HELP: [&str; 10] = [
    "/newtest – create a test",
    "/done – finish creating a test",
    "/deletetest ID – delete a test",
    "/showtests – list tests",
    "/showquestions TEST_ID – list the questions of a test",
    "/delquestion ID – delete one question",
    "/addlink A1|B1 https://t.me/... [max] – add a group link",
    "/dellink ID – delete a group link",
    "/showlinks – list group links",
    "/stats – all results",
];

pub fn help(is_admin: bool) -> OutboundMessage {
    let mut body = String::from("🤖 Bot commands:\n\n🧑‍🎓 Participants:\n");
    for line in PARTICIPANT_HELP {
        body.push_str(&format!("  • {}\n", line));
    }
    if is_admin {
        body.push_str("\n🛠 Admin:\n");
        for line in ADMIN_HELP {
            body.push_str(&format!("  • {}\n", line));
        }
    }
    OutboundMessage::with_buttons(body, main_menu(is_admin))
}

pub async fn show_tests(app: &App) -> BotResult<Vec<OutboundMessage>> {
    let tests = app.repo().list_tests().await?;
    if tests.is_empty() {
        return Ok(vec![OutboundMessage::text("❌ There are no tests.")]);
    }
    let mut body = String::from("📋 Tests:\n");
    for test in tests {
        body.push_str(&format!(
            "{}) {} ({} questions)\n",
            test.id, test.name, test.question_count
        ));
    }
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn delete_test(app: &App, args: &[String]) -> BotResult<Vec<OutboundMessage>> {
    let test_id = parse_id(args, "❌ Usage: /deletetest TEST_ID")?;
    let body = if app.repo().delete_test(test_id).await? {
        log::info!("test {} deleted", test_id);
        format!("✅ Test (id={}) deleted.", test_id)
    } else {
        format!("❌ Test (id={}) not found.", test_id)
    };
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn show_questions(app: &App, args: &[String]) -> BotResult<Vec<OutboundMessage>> {
    let test_id = parse_id(args, "❌ Usage: /showquestions TEST_ID")?;
    let questions = app.repo().list_questions(test_id).await?;
    if questions.is_empty() {
        return Ok(vec![OutboundMessage::text(format!(
            "❌ Test (id={}) has no questions.",
            test_id
        ))]);
    }
    let mut body = format!("📋 Questions of test {}:\n", test_id);
    for question in questions {
        body.push_str(&format!(
            "{}) {} [{}]\n",
            question.id, question.text, question.correct
        ));
    }
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn delete_question(app: &App, args: &[String]) -> BotResult<Vec<OutboundMessage>> {
    let question_id = parse_id(args, "❌ Usage: /delquestion QUESTION_ID")?;
    let Some(question) = app.repo().get_question(question_id).await? else {
        return Ok(vec![OutboundMessage::text(format!(
            "❌ Question (id={}) not found.",
            question_id
        ))]);
    };
    app.repo().delete_question(question.id).await?;
    log::info!("question {} of test {} deleted", question.id, question.test_id);
    Ok(vec![OutboundMessage::text(format!(
        "✅ Question (id={}) deleted from test {}.",
        question.id, question.test_id
    ))])
}

/// Registers a group by hand: `/addlink LABEL URL [capacity]`.
pub async fn add_link(app: &App, args: &[String]) -> BotResult<Vec<OutboundMessage>> {
    let (label, url) = match args {
        [label, url, ..] => (label.to_uppercase(), url.clone()),
        _ => return Err(BotError::validation(format!("❌ {}", ADD_LINK_USAGE))),
    };
    if parse_label(&label).is_none() {
        return Err(BotError::validation(
            "❌ The group name must be a letter followed by a number, e.g. A1.",
        ));
    }
    let capacity = match args.get(2) {
        Some(raw) => Some(
            raw.parse::<u32>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or_else(|| BotError::validation("❌ max_users must be a positive number."))?,
        ),
        None => None,
    };

    let group = app
        .repo()
        .create_group(NewGroup {
            label,
            url,
            capacity,
        })
        .await?
        .ok_or_else(|| BotError::validation("❌ A group with this name already exists."))?;
    log::info!("group {} added by hand", group.label);
    Ok(vec![OutboundMessage::text(format!(
        "✅ Link added (id={}).",
        group.id
    ))])
}

pub async fn delete_link(app: &App, args: &[String]) -> BotResult<Vec<OutboundMessage>> {
    let group_id = parse_id(args, "❌ Usage: /dellink LINK_ID")?;
    let body = if app.repo().delete_group(group_id).await? {
        "✅ Link deleted."
    } else {
        "❌ Link not found."
    };
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn show_links(app: &App) -> BotResult<Vec<OutboundMessage>> {
    let groups = app.repo().list_groups(None).await?;
    if groups.is_empty() {
        return Ok(vec![OutboundMessage::text("No links found.")]);
    }
    let default_capacity = app.config().group_capacity;
    let mut body = String::from("📌 Links:\n");
    for group in groups {
        body.push_str(&format!(
            "{}) {} — {} ({}/{})\n",
            group.id,
            group.label,
            group.url,
            group.current_count,
            group.effective_capacity(default_capacity)
        ));
    }
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn stats(app: &App) -> BotResult<Vec<OutboundMessage>> {
    let results = app.repo().list_results().await?;
    if results.is_empty() {
        return Ok(vec![OutboundMessage::text("📊 No results yet.")]);
    }

    let groups: HashMap<i64, Group> = app
        .repo()
        .list_groups(None)
        .await?
        .into_iter()
        .map(|group| (group.id, group))
        .collect();

    let mut body = String::from("📊 Results:\n\n");
    for result in results {
        let name = match app.repo().get_user(result.user_id).await? {
            Some(user) if !user.display_name.is_empty() => user.display_name,
            _ => result.user_id.to_string(),
        };
        let group = result
            .group_id
            .and_then(|id| groups.get(&id))
            .map_or("—", |group| group.label.as_str());
        body.push_str(&format!(
            "👤 {} — {}/{}, group: {}\n",
            name, result.score, result.total, group
        ));
    }
    Ok(vec![OutboundMessage::text(body)])
}

pub async fn my_score(app: &App, user_id: i64) -> BotResult<Vec<OutboundMessage>> {
    let Some(user) = app.repo().get_user(user_id).await? else {
        return Ok(vec![OutboundMessage::text(
            "You have not taken a test yet.",
        )]);
    };
    let group = match user.last_group_id {
        Some(group_id) => app.repo().get_group(group_id).await?,
        None => None,
    };
    let name = if user.display_name.is_empty() {
        user.id.to_string()
    } else {
        user.display_name
    };
    let (label, url) = group
        .map(|group| (group.label, group.url))
        .unwrap_or_else(|| ("—".to_string(), "—".to_string()));
    Ok(vec![OutboundMessage::text(format!(
        "{}: {} points\nGroup: {}\nLink: {}",
        name, user.score, label, url
    ))])
}

fn parse_id(args: &[String], usage: &str) -> BotResult<i64> {
    let raw = args.first().ok_or_else(|| BotError::validation(usage))?;
    raw.parse()
        .map_err(|_| BotError::validation("❌ The ID must be an integer."))
}
