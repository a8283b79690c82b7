//! Reminder rendering.
//!
//! Rendering is two-phase: every [`Need`] is first rendered as its own
//! template against the message context, then the top-level message template
//! is rendered with those results as `InterpretedNeeds`. Need output is
//! embedded as plain text, so nothing it contains is expanded a second time.

use handlebars::Handlebars;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::ComposeError;
use crate::filter::Need;

/// Message template bundled with the binary.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = include_str!("../assets/message.hbs");

pub const GREETINGS: &[&str] = &[
    "Greetings and salutations",
    "Ahoy-hoy",
    "Konnichiwa",
    "Buongiorno",
    "Hola",
    "Habari",
    "Goedendag",
    "Namaste",
    "Shalom",
];

const MESSAGE: &str = "message";

/// Per-run message settings shared by every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub bot_name: String,
    pub company: String,
    pub security_training_url: String,
    pub help_channel: String,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            bot_name: "ComplyBot3000".into(),
            company: "Chainguard".into(),
            security_training_url:
                "https://securityawareness.usalearning.gov/cybersecurity/index.htm".into(),
            help_channel: "#security-and-compliance".into(),
        }
    }
}

/// Render-time view of one reminder. Field names are the template's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageContext {
    pub email: String,
    pub bot_name: String,
    /// Picked at random when unset.
    pub greetings: Option<String>,
    pub first_name: String,
    pub company: String,
    #[serde(rename = "SecurityTrainingURL")]
    pub security_training_url: String,
    pub needs: Vec<Need>,
    /// Filled in by [`MessageComposer::compose`], one entry per need.
    pub interpreted_needs: Vec<String>,
    pub help_channel: String,
}

impl MessageContext {
    pub fn new(
        settings: &ComposerSettings,
        email: impl Into<String>,
        first_name: impl Into<String>,
        needs: Vec<Need>,
    ) -> Self {
        Self {
            email: email.into(),
            bot_name: settings.bot_name.clone(),
            greetings: None,
            first_name: first_name.into(),
            company: settings.company.clone(),
            security_training_url: settings.security_training_url.clone(),
            needs,
            interpreted_needs: Vec::new(),
            help_channel: settings.help_channel.clone(),
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greetings = Some(greeting.into());
        self
    }
}

/// Renders reminders from a message template.
///
/// Rendering is strict: a reference to a field the context does not have is
/// an error rather than an empty string. Output is not HTML-escaped.
pub struct MessageComposer<R = StdRng> {
    registry: Handlebars<'static>,
    rng: R,
}

impl MessageComposer<StdRng> {
    /// Composer with an OS-seeded greeting picker.
    pub fn new(template: &str) -> Result<Self, ComposeError> {
        Self::with_rng(template, StdRng::from_os_rng())
    }
}

impl<R: Rng> MessageComposer<R> {
    pub fn with_rng(template: &str, rng: R) -> Result<Self, ComposeError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(MESSAGE, template)
            .map_err(|e| ComposeError::Template {
                name: MESSAGE.into(),
                source: Box::new(e),
            })?;
        Ok(Self { registry, rng })
    }

    /// Render the reminder for `ctx`.
    pub fn compose(&mut self, mut ctx: MessageContext) -> Result<String, ComposeError> {
        if ctx.greetings.is_none() {
            ctx.greetings = Some(self.pick_greeting().to_string());
        }

        let mut interpreted = Vec::with_capacity(ctx.needs.len());
        for (i, need) in ctx.needs.iter().enumerate() {
            let text = self
                .registry
                .render_template(need.template(), &ctx)
                .map_err(|e| ComposeError::Render {
                    name: format!("need #{}", i + 1),
                    source: Box::new(e),
                })?;
            interpreted.push(text);
        }
        ctx.interpreted_needs = interpreted;

        self.registry
            .render(MESSAGE, &ctx)
            .map_err(|e| ComposeError::Render {
                name: MESSAGE.into(),
                source: Box::new(e),
            })
    }

    fn pick_greeting(&mut self) -> &'static str {
        GREETINGS[self.rng.random_range(0..GREETINGS.len())]
    }
}
