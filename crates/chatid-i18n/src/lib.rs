//! Chatid Localization
//!
//! Static per-language text tables keyed by `TextKey`, with positional
//! `{}` substitution done by the caller via [`render`]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hebrew,
    Russian,
}

impl std::str::FromStr for Language {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "he" | "iw" | "hebrew" => Ok(Language::Hebrew),
            "ru" | "russian" => Ok(Language::Russian),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "en"),
            Language::Hebrew => write!(f, "he"),
            Language::Russian => write!(f, "ru"),
        }
    }
}

impl Language {
    /// Best-effort mapping from a Telegram `language_code` (e.g. "he-IL").
    pub fn from_language_code(code: &str) -> Option<Self> {
        code.split('-').next().and_then(|tag| tag.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    Welcome,
    ChoseChatType,
    UserButton,
    BotButton,
    GroupButton,
    ChannelButton,
    ChatManager,
    ChoiceLang,
    LangDone,
    IdUser,
    IdChannelOrGroup,
    IdHidden,
    IdUsers,
    IdChannelsOrGroups,
    NotHaveId,
    CanNotGetTheId,
    BotAddedToGroup,
    AddBotToGroup,
    ButtonAddBotToGroup,
    ButtonGetLink,
    LinkToChat,
    FormatLink,
    BusinessConnection,
    BusinessConnectionDisabled,
    BusinessConnectionRemoved,
    IdByManageBusiness,
    InfoAbout,
    ButtonDev,
    LinkDev,
}

/// Template lookup. Placeholders are positional `{}`, filled by [`render`].
pub fn text(key: TextKey, lang: Language) -> &'static str {
    use Language::*;
    match key {
        TextKey::Welcome => match lang {
            English => {
                "Hi {}! 👋\n\n\
                 I can tell you the ID of any user, bot, group or channel.\n\
                 Forward me a message, share a contact, reply to a story, \
                 send a username — or pick a chat type below."
            }
            Hebrew => {
                "היי {}! 👋\n\n\
                 אני יכול להגיד לך את המזהה של כל משתמש, בוט, קבוצה או ערוץ.\n\
                 אפשר להעביר אליי הודעה, לשתף איש קשר, להגיב לסטורי, \
                 לשלוח שם משתמש — או לבחור סוג צ'אט למטה."
            }
            Russian => {
                "Привет, {}! 👋\n\n\
                 Я могу сообщить ID любого пользователя, бота, группы или канала.\n\
                 Перешлите мне сообщение, поделитесь контактом, ответьте на историю, \
                 отправьте username — или выберите тип чата ниже."
            }
        },
        TextKey::ChoseChatType => match lang {
            English => "Choose a chat type",
            Hebrew => "בחרו סוג צ'אט",
            Russian => "Выберите тип чата",
        },
        TextKey::UserButton => match lang {
            English => "User 👤",
            Hebrew => "משתמש 👤",
            Russian => "Пользователь 👤",
        },
        TextKey::BotButton => match lang {
            English => "Bot 🤖",
            Hebrew => "בוט 🤖",
            Russian => "Бот 🤖",
        },
        TextKey::GroupButton => match lang {
            English => "Group 👥",
            Hebrew => "קבוצה 👥",
            Russian => "Группа 👥",
        },
        TextKey::ChannelButton => match lang {
            English => "Channel 📢",
            Hebrew => "ערוץ 📢",
            Russian => "Канал 📢",
        },
        TextKey::ChatManager => match lang {
            English => "Pick a group or channel you manage to get its ID.",
            Hebrew => "בחרו קבוצה או ערוץ שאתם מנהלים כדי לקבל את המזהה.",
            Russian => "Выберите группу или канал, которыми вы управляете, чтобы получить ID.",
        },
        TextKey::ChoiceLang => match lang {
            English => "Choose your language:",
            Hebrew => "בחרו שפה:",
            Russian => "Выберите язык:",
        },
        TextKey::LangDone => match lang {
            English => "Language changed to {} ✅",
            Hebrew => "השפה שונתה ל-{} ✅",
            Russian => "Язык изменён на {} ✅",
        },
        TextKey::IdUser => match lang {
            English => "The ID of {} is:\n`{}`",
            Hebrew => "המזהה של {} הוא:\n`{}`",
            Russian => "ID пользователя {}:\n`{}`",
        },
        TextKey::IdChannelOrGroup => match lang {
            English => "The ID of {} is:\n`{}`",
            Hebrew => "המזהה של {} הוא:\n`{}`",
            Russian => "ID чата {}:\n`{}`",
        },
        TextKey::IdHidden => match lang {
            English => "{} hides their account when forwarding, so the ID is not available.",
            Hebrew => "{} מסתיר/ה את החשבון בהעברת הודעות, ולכן המזהה אינו זמין.",
            Russian => "{} скрывает свой аккаунт при пересылке, поэтому ID недоступен.",
        },
        TextKey::IdUsers => match lang {
            English => "The IDs of the shared users:{}",
            Hebrew => "המזהים של המשתמשים ששותפו:{}",
            Russian => "ID выбранных пользователей:{}",
        },
        TextKey::IdChannelsOrGroups => match lang {
            English => "The IDs of the shared chats:{}",
            Hebrew => "המזהים של הצ'אטים ששותפו:{}",
            Russian => "ID выбранных чатов:{}",
        },
        TextKey::NotHaveId => match lang {
            English => "This contact has no Telegram account, so there is no ID to show.",
            Hebrew => "לאיש הקשר הזה אין חשבון טלגרם, ולכן אין מזהה להציג.",
            Russian => "У этого контакта нет аккаунта Telegram, поэтому ID отсутствует.",
        },
        TextKey::CanNotGetTheId => match lang {
            English => "I can't resolve that username to an ID. Check the spelling and try again.",
            Hebrew => "לא הצלחתי למצוא מזהה לשם המשתמש הזה. בדקו את האיות ונסו שוב.",
            Russian => "Не удалось найти ID по этому username. Проверьте написание и попробуйте ещё раз.",
        },
        TextKey::BotAddedToGroup => match lang {
            English => "I was added to {}!\nThe group ID is `{}`.",
            Hebrew => "נוספתי אל {}!\nמזהה הקבוצה הוא `{}`.",
            Russian => "Меня добавили в {}!\nID группы: `{}`.",
        },
        TextKey::AddBotToGroup => match lang {
            English => "Use the button below to add me to a group. I'll reply with the group ID right away.",
            Hebrew => "השתמשו בכפתור למטה כדי להוסיף אותי לקבוצה. אענה עם מזהה הקבוצה מיד.",
            Russian => "Нажмите кнопку ниже, чтобы добавить меня в группу. Я сразу отвечу с её ID.",
        },
        TextKey::ButtonAddBotToGroup => match lang {
            English => "Add me to a group ➕",
            Hebrew => "הוסיפו אותי לקבוצה ➕",
            Russian => "Добавить меня в группу ➕",
        },
        TextKey::ButtonGetLink => match lang {
            English => "Get a link to the chat 🔗",
            Hebrew => "קבלו קישור לצ'אט 🔗",
            Russian => "Получить ссылку на чат 🔗",
        },
        TextKey::LinkToChat => match lang {
            English => "Link to chat `{}`:",
            Hebrew => "קישור לצ'אט `{}`:",
            Russian => "Ссылка на чат `{}`:",
        },
        TextKey::FormatLink => match lang {
            English => "Usage: /link <chat id>",
            Hebrew => "שימוש: /link <מזהה צ'אט>",
            Russian => "Использование: /link <ID чата>",
        },
        TextKey::BusinessConnection => match lang {
            English => {
                "The business connection is active 🤝\n\
                 Reply to any message in your business chats and I'll fill in the ID."
            }
            Hebrew => {
                "חיבור העסק פעיל 🤝\n\
                 הגיבו לכל הודעה בצ'אטים העסקיים שלכם ואני אשלים את המזהה."
            }
            Russian => {
                "Бизнес-подключение активно 🤝\n\
                 Ответьте на любое сообщение в бизнес-чатах, и я подставлю ID."
            }
        },
        TextKey::BusinessConnectionDisabled => match lang {
            English => "I was connected to your business account, but without permission to reply I can't fill in IDs.",
            Hebrew => "חוברתי לחשבון העסקי שלכם, אבל ללא הרשאת מענה אני לא יכול להשלים מזהים.",
            Russian => "Я подключён к вашему бизнес-аккаунту, но без права отвечать не могу подставлять ID.",
        },
        TextKey::BusinessConnectionRemoved => match lang {
            English => "The business connection was removed. You can reconnect me anytime from your business settings.",
            Hebrew => "חיבור העסק הוסר. אפשר לחבר אותי מחדש בכל עת מהגדרות העסק.",
            Russian => "Бизнес-подключение удалено. Вы можете снова подключить меня в настройках бизнеса.",
        },
        TextKey::IdByManageBusiness => match lang {
            English => "The ID of this business chat is:\n`{}`",
            Hebrew => "המזהה של הצ'אט העסקי הזה הוא:\n`{}`",
            Russian => "ID этого бизнес-чата:\n`{}`",
        },
        TextKey::InfoAbout => match lang {
            English => {
                "This bot resolves the numeric ID of users, bots, groups and channels.\n\
                 It stores only what it needs to answer you: your ID and language choice."
            }
            Hebrew => {
                "הבוט הזה מאתר את המזהה המספרי של משתמשים, בוטים, קבוצות וערוצים.\n\
                 הוא שומר רק את מה שנדרש כדי לענות: המזהה שלכם ובחירת השפה."
            }
            Russian => {
                "Этот бот находит числовой ID пользователей, ботов, групп и каналов.\n\
                 Он хранит только нужное для ответа: ваш ID и выбранный язык."
            }
        },
        TextKey::ButtonDev => match lang {
            English => "Developer 👨‍💻",
            Hebrew => "מפתח 👨‍💻",
            Russian => "Разработчик 👨‍💻",
        },
        TextKey::LinkDev => "https://t.me/chatid_support",
    }
}

/// Fill positional `{}` placeholders left to right. Surplus placeholders
/// are left as-is, surplus args are ignored.
pub fn render(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut args = args.iter();
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: &[TextKey] = &[
        TextKey::Welcome,
        TextKey::ChoseChatType,
        TextKey::UserButton,
        TextKey::BotButton,
        TextKey::GroupButton,
        TextKey::ChannelButton,
        TextKey::ChatManager,
        TextKey::ChoiceLang,
        TextKey::LangDone,
        TextKey::IdUser,
        TextKey::IdChannelOrGroup,
        TextKey::IdHidden,
        TextKey::IdUsers,
        TextKey::IdChannelsOrGroups,
        TextKey::NotHaveId,
        TextKey::CanNotGetTheId,
        TextKey::BotAddedToGroup,
        TextKey::AddBotToGroup,
        TextKey::ButtonAddBotToGroup,
        TextKey::ButtonGetLink,
        TextKey::LinkToChat,
        TextKey::FormatLink,
        TextKey::BusinessConnection,
        TextKey::BusinessConnectionDisabled,
        TextKey::BusinessConnectionRemoved,
        TextKey::IdByManageBusiness,
        TextKey::InfoAbout,
        TextKey::ButtonDev,
        TextKey::LinkDev,
    ];

    #[test]
    fn every_key_has_text_in_every_language() {
        for key in ALL_KEYS {
            for lang in [Language::English, Language::Hebrew, Language::Russian] {
                assert!(!text(*key, lang).is_empty(), "{:?}/{}", key, lang);
            }
        }
    }

    #[test]
    fn render_fills_placeholders_in_order() {
        assert_eq!(render("{} is {}", &["a", "b"]), "a is b");
    }

    #[test]
    fn render_leaves_surplus_placeholders() {
        assert_eq!(render("{} and {}", &["only"]), "only and {}");
    }

    #[test]
    fn render_ignores_surplus_args() {
        assert_eq!(render("just {}", &["one", "two"]), "just one");
    }

    #[test]
    fn language_parses_telegram_language_codes() {
        assert_eq!(Language::from_language_code("he-IL"), Some(Language::Hebrew));
        assert_eq!(Language::from_language_code("en"), Some(Language::English));
        assert_eq!(Language::from_language_code("xx"), None);
    }

    #[test]
    fn language_roundtrips_through_display() {
        for lang in [Language::English, Language::Hebrew, Language::Russian] {
            assert_eq!(lang.to_string().parse::<Language>(), Ok(lang));
        }
    }
}
