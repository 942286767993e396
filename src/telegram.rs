use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup, User,
};

use crate::event::{Buttons, Event, Incoming};

pub fn reply_markup(buttons: &Buttons) -> ReplyMarkup {
    match buttons {
        Buttons::Choices(rows) => ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(
            rows.iter().map(|row| {
                row.iter()
                    .map(|button| InlineKeyboardButton::callback(&button.label, &button.token))
                    .collect::<Vec<_>>()
            }),
        )),
        Buttons::Menu(rows) => ReplyMarkup::Keyboard(KeyboardMarkup::new(
            rows.iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect::<Vec<_>>()),
        )),
    }
}

pub fn incoming(user: &User, event: Event) -> Incoming {
    Incoming::new(user.id.0 as i64, user.full_name(), event)
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::event::ChoiceButton;

    #[test]
    fn choices_become_callback_buttons() {
        let buttons = Buttons::Choices(vec![vec![
            ChoiceButton::new("A", "answer:A"),
            ChoiceButton::new("B", "answer:B"),
        ]]);

        let ReplyMarkup::InlineKeyboard(markup) = reply_markup(&buttons) else {
            panic!("expected an inline keyboard");
        };
        assert_eq!(markup.inline_keyboard.len(), 1);
        let second = &markup.inline_keyboard[0][1];
        assert_eq!(second.text, "B");
        assert!(matches!(
            &second.kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "answer:B"
        ));
    }

    #[test]
    fn menus_become_reply_keyboards() {
        let buttons = Buttons::Menu(vec![vec!["one".to_string()], vec!["two".to_string()]]);

        let ReplyMarkup::Keyboard(markup) = reply_markup(&buttons) else {
            panic!("expected a reply keyboard");
        };
        assert_eq!(markup.keyboard.len(), 2);
        assert_eq!(markup.keyboard[1][0].text, "two");
    }
}
