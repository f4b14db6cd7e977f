//! UI-facing events and error modeling for the marketplace controller.

use shared::domain::{Card, Listing, Pack, UserProfile};

use super::state::View;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ViewChanged(View),
    Toast(Toast),
    Loading(bool),
    SessionChanged(Option<UserProfile>),
    BalanceUpdated(i64),
    ListingsUpdated {
        card_name: String,
        listings: Vec<Listing>,
    },
    PacksUpdated(Vec<Pack>),
    CollectionUpdated(Vec<Card>),
    PackOpened {
        pack_name: String,
        cards: Vec<Card>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Login,
    Register,
    Catalog,
    Listings,
    Purchase,
    Packs,
    Collection,
    Sell,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    /// Input rejected before any request was issued.
    pub fn validation(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Validation,
            context,
            message: message.into(),
        }
    }

    /// Action needs a logged-in user.
    pub fn login_required(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Auth,
            context,
            message: message.into(),
        }
    }

    pub fn from_client_error(
        context: UiErrorContext,
        error: &ClientError,
        message: impl Into<String>,
    ) -> Self {
        let category = match error {
            ClientError::Unauthorized => UiErrorCategory::Auth,
            ClientError::Api { status, .. } => match status {
                401 | 403 => UiErrorCategory::Auth,
                400 | 404 | 409 | 422 => UiErrorCategory::Validation,
                502..=504 => UiErrorCategory::Transport,
                _ => UiErrorCategory::Unknown,
            },
            ClientError::Transport(_) => UiErrorCategory::Transport,
            ClientError::InvalidUrl(_) => UiErrorCategory::Validation,
            ClientError::Decode(_) => UiErrorCategory::Unknown,
        };

        Self {
            category,
            context,
            message: message.into(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UiError {}

#[cfg(test)]
mod tests {
    use shared::error::{ApiError, ErrorCode};

    use super::*;

    #[test]
    fn api_status_drives_category() {
        let insufficient = ClientError::from_api(
            400,
            ApiError::new(ErrorCode::Validation, "Insufficient funds"),
        );
        let error = UiError::from_client_error(
            UiErrorContext::Purchase,
            &insufficient,
            insufficient.to_string(),
        );
        assert_eq!(error.category(), UiErrorCategory::Validation);
        assert_eq!(error.message(), "Insufficient funds");

        let expired = UiError::from_client_error(
            UiErrorContext::Collection,
            &ClientError::Unauthorized,
            "Failed to load collection",
        );
        assert!(expired.requires_reauth());
        assert_eq!(expired.context(), UiErrorContext::Collection);
    }
}
