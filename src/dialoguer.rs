use std::fmt;

use dialoguer::{console::Term, theme::ColorfulTheme, Select};
use error_stack::{IntoReport, Result, ResultExt};

#[derive(Debug)]
pub struct DialoguerError;

impl fmt::Display for DialoguerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dialoguer error")
    }
}

impl std::error::Error for DialoguerError {}

pub type DialoguerResult<T> = error_stack::Result<T, DialoguerError>;

#[derive(Debug, Clone)]
pub struct Dialoguer;

impl Dialoguer {
    /// Returns `None` when the prompt is dismissed with Esc or q.
    pub fn select<T>(
        prompt_text: String,
        items: &[T],
        default: Option<usize>,
    ) -> Result<Option<usize>, DialoguerError>
    where
        T: ToString,
    {
        let colorful_theme = &ColorfulTheme::default();
        let mut select = Select::with_theme(colorful_theme);
        let dialog = select
            .with_prompt(&prompt_text)
            .items(items)
            .default(default.unwrap_or(0));

        dialog
            .interact_on_opt(&Term::stderr())
            .into_report()
            .change_context(DialoguerError)
    }

    pub fn select_yes_or_no(prompt_text: String) -> Result<bool, DialoguerError> {
        let colorful_theme = &ColorfulTheme::default();
        let mut select = Select::with_theme(colorful_theme);
        let dialog = select
            .with_prompt(&prompt_text)
            .item("yes")
            .item("no")
            .default(0);
        let opt = dialog
            .interact_on_opt(&Term::stderr())
            .into_report()
            .change_context(DialoguerError)?
            .ok_or(DialoguerError)
            .into_report()?;

        Ok(opt == 0)
    }
}
