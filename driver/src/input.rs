//! Per-turn input state and node-type validation.
//!
//! DESIGN
//! ======
//! Every node type maps to one input affordance; `compute_user_input` is
//! the single place that turns the transient [`TurnInput`] buffers into
//! the string sent on the wire, or a typed validation error. Nothing here
//! performs I/O, so every rule is unit-testable.

use std::sync::LazyLock;

use protocol::{ButtonOption, NodeBody};
use regex::Regex;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("static regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{1,3}\d{10}$").expect("static regex"));

/// Wire format for submitted dates.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[month]-[day]-[year]");

// =============================================================================
// ERROR TYPE
// =============================================================================

/// A validation failure. The message is the user-visible error string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please enter a message.")]
    EmptyText,
    #[error("Please enter digits only.")]
    InvalidNumber,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Please enter a valid phone number.")]
    InvalidPhone,
    #[error("Please pick a date.")]
    MissingDate,
    #[error("Please choose an option.")]
    MissingChoice,
    #[error("Please select at least one option.")]
    NoSelection,
    #[error("This step displays content only.")]
    MediaBlocked,
}

// =============================================================================
// MEDIA BEHAVIOR
// =============================================================================

/// How the driver lets the user proceed past a passive media node. The
/// protocol leaves this open, so it is a host configuration choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaBehavior {
    /// Fall through to the free-text affordance (legacy widget behavior).
    #[default]
    FreeText,
    /// Send a fixed acknowledgement string, no input required.
    AutoAcknowledge(String),
    /// Media nodes are dead ends; sending is a validation error.
    Blocked,
}

// =============================================================================
// TURN INPUT
// =============================================================================

/// Transient input buffers, reset after every successful turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// Free-text box contents.
    pub text: String,
    /// Date-picker selection.
    pub date: Option<Date>,
    /// Country-code selector value, e.g. `"+1"`.
    pub phone_country: String,
    /// National number digits.
    pub phone_digits: String,
    /// Dropdown choice.
    pub choice: Option<ButtonOption>,
    /// Button-grid selections, in selection order.
    pub selections: Vec<ButtonOption>,
}

impl TurnInput {
    /// Reset every buffer to empty.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Toggle a button in the selection set. Returns whether the option is
    /// selected after the call. Selection order is preserved.
    pub fn toggle_selection(&mut self, option: &ButtonOption) -> bool {
        if let Some(pos) = self.selections.iter().position(|o| o.id == option.id) {
            self.selections.remove(pos);
            false
        } else {
            let mut selected = option.clone();
            selected.selected = true;
            self.selections.push(selected);
            true
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn non_empty_text(input: &TurnInput) -> Result<String, InputError> {
    let trimmed = input.text.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyText);
    }
    Ok(trimmed.to_owned())
}

/// Turn the buffers into the wire `userInput` for the given node type, or
/// fail with the error the host should display. Performs no I/O and never
/// mutates the buffers.
pub(crate) fn compute_user_input(
    body: &NodeBody,
    input: &TurnInput,
    media: &MediaBehavior,
) -> Result<String, InputError> {
    match body {
        // LABEL is display-only; the free-text box stays available so the
        // conversation can proceed. Unknown node types fall back the same way.
        NodeBody::Text(_) | NodeBody::Label(_) | NodeBody::Link(_) | NodeBody::Location(_)
        | NodeBody::Other { .. } => non_empty_text(input),
        NodeBody::Number(_) => {
            let trimmed = input.text.trim();
            if !NUMBER_RE.is_match(trimmed) {
                return Err(InputError::InvalidNumber);
            }
            Ok(trimmed.to_owned())
        }
        NodeBody::Email(_) => {
            let trimmed = input.text.trim();
            if !EMAIL_RE.is_match(trimmed) {
                return Err(InputError::InvalidEmail);
            }
            Ok(trimmed.to_owned())
        }
        NodeBody::Phone(_) => {
            let combined = format!("{}{}", input.phone_country.trim(), input.phone_digits.trim());
            if !PHONE_RE.is_match(&combined) {
                return Err(InputError::InvalidPhone);
            }
            Ok(combined)
        }
        NodeBody::Date(_) => {
            let date = input.date.ok_or(InputError::MissingDate)?;
            format_date(date)
        }
        NodeBody::Dropdown(_) => {
            let choice = input.choice.as_ref().ok_or(InputError::MissingChoice)?;
            Ok(choice.label.clone())
        }
        NodeBody::Buttons(_) => {
            if input.selections.is_empty() {
                return Err(InputError::NoSelection);
            }
            let labels: Vec<&str> = input.selections.iter().map(|o| o.label.as_str()).collect();
            Ok(labels.join(", "))
        }
        NodeBody::Image(_) | NodeBody::Video(_) | NodeBody::Audio(_) | NodeBody::File(_) => {
            match media {
                MediaBehavior::FreeText => non_empty_text(input),
                MediaBehavior::AutoAcknowledge(ack) => Ok(ack.clone()),
                MediaBehavior::Blocked => Err(InputError::MediaBlocked),
            }
        }
    }
}

/// Format a picked date as `MM-dd-yyyy`.
fn format_date(date: Date) -> Result<String, InputError> {
    // Formatting a valid `Date` with this description cannot fail; the
    // error arm exists to avoid panicking on future format edits.
    date.format(&DATE_FORMAT).map_err(|_| InputError::MissingDate)
}

#[cfg(test)]
#[path = "input_test.rs"]
mod tests;
