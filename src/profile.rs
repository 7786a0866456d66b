use std::error::Error;
use std::sync::Arc;

use teloxide::dispatching::dialogue::{Dialogue, ErasedStorage};
use teloxide::types::{ChatId, UserId};

use crate::quiz::Language;

/// Per-user state kept in the dialogue storage. Quiz progress lives in the
/// session store instead.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    Ready {
        lang: Language,
    },
}

pub type ProfileStorage = Arc<ErasedStorage<State>>;
pub type ProfileDialogue = Dialogue<State, ErasedStorage<State>>;

type ProfileResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// The profile of the Telegram user behind an update.
///
/// Storage rows are keyed by user id, so a language follows the user across
/// private and group chats. Updates without a sender fall back to the chat.
pub fn profile(storage: ProfileStorage, user: Option<UserId>, chat: ChatId) -> ProfileDialogue {
    let key = user.map_or(chat, |user| ChatId(user.0 as i64));
    Dialogue::new(storage, key)
}

/// The stored language, or one guessed from the Telegram client and remembered.
pub async fn resolve_language(
    profile: &ProfileDialogue,
    client_code: Option<&str>,
) -> ProfileResult<Language> {
    if let Some(State::Ready { lang }) = profile.get().await? {
        return Ok(lang);
    }
    let lang = Language::from_client_code(client_code);
    set_language(profile, lang).await?;
    Ok(lang)
}

pub async fn set_language(profile: &ProfileDialogue, lang: Language) -> ProfileResult<()> {
    profile.update(State::Ready { lang }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use teloxide::dispatching::dialogue::{InMemStorage, Storage};

    use super::*;

    const GROUP: ChatId = ChatId(-100_200);

    fn storage() -> ProfileStorage {
        InMemStorage::<State>::new().erase()
    }

    #[tokio::test]
    async fn users_in_one_group_keep_their_own_language() {
        let storage = storage();
        let alice = profile(storage.clone(), Some(UserId(11)), GROUP);
        let bob = profile(storage.clone(), Some(UserId(12)), GROUP);

        set_language(&alice, Language::Zh).await.unwrap();
        assert_eq!(resolve_language(&bob, Some("en-US")).await.unwrap(), Language::En);
        assert_eq!(resolve_language(&alice, Some("en-US")).await.unwrap(), Language::Zh);
    }

    #[tokio::test]
    async fn language_follows_the_user_across_chats() {
        let storage = storage();
        let in_group = profile(storage.clone(), Some(UserId(11)), GROUP);
        set_language(&in_group, Language::Zh).await.unwrap();

        let in_private = profile(storage, Some(UserId(11)), ChatId(11));
        assert_eq!(resolve_language(&in_private, None).await.unwrap(), Language::Zh);
    }

    #[tokio::test]
    async fn guessed_language_is_remembered() {
        let storage = storage();
        let user = profile(storage.clone(), Some(UserId(11)), GROUP);
        assert_eq!(resolve_language(&user, Some("zh-hans")).await.unwrap(), Language::Zh);

        let again = profile(storage, Some(UserId(11)), ChatId(11));
        assert_eq!(resolve_language(&again, Some("en")).await.unwrap(), Language::Zh);
    }

    #[tokio::test]
    async fn updates_without_sender_use_the_chat() {
        let storage = storage();
        let anonymous = profile(storage.clone(), None, GROUP);
        set_language(&anonymous, Language::Zh).await.unwrap();

        let member = profile(storage.clone(), Some(UserId(11)), GROUP);
        assert_eq!(resolve_language(&member, None).await.unwrap(), Language::En);
        assert_eq!(
            resolve_language(&profile(storage, None, GROUP), None).await.unwrap(),
            Language::Zh
        );
    }
}
