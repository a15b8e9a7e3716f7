//! The multi-step content-submission wizard.
//!
//! One explicit state machine instead of handlers scattered per step: each
//! transition either advances with the accumulated draft or reports a
//! format error and stays put, so the caller may retry the same step. The
//! machine itself is pure — offsets are read from the store once and
//! passed in, and the completed draft is handed back for persisting.

use herald_core::{
  clock::parse_local,
  content::{NewContent, Section},
  region::{OffsetSnapshot, Region},
};

/// One inbound message, reduced to what the wizard cares about.
#[derive(Debug, Clone, Copy)]
pub enum WizardInput<'a> {
  Text(&'a str),
  Photo { file_id: &'a str },
}

/// Accumulated fields for an in-flight submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
  pub section: Section,
  pub content: NewContent,
}

/// Wizard states. Singleton submissions run title → three region times →
/// photo; an event is a single formatted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wizard {
  /// Banner entry: `title ; name` on one line.
  TitleAndName { section: Section },
  /// Ship/tower entry: a bare title.
  TitleOnly { section: Section },
  /// `name ; end time ; description` for a new event.
  EventLine,
  /// Collecting the end time for `region`.
  RegionTime { draft: Draft, region: Region },
  /// Waiting for the promotional image.
  Photo { draft: Draft },
}

/// Transition outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  /// Prompt for the next field, or re-prompt after a format error.
  Prompt { next: Wizard, reply: String },
  /// All fields collected; the caller persists and confirms.
  Finished { section: Section, content: NewContent },
}

impl Wizard {
  /// Entry state and first prompt for a section's submission flow.
  pub fn start(section: Section) -> (Wizard, String) {
    match section {
      Section::Banner => (
        Wizard::TitleAndName { section },
        "Send the content title and event name, separated by ` ; `."
          .to_owned(),
      ),
      Section::Ship | Section::Tower => {
        (Wizard::TitleOnly { section }, "Send the content title:".to_owned())
      }
      Section::Events => (
        Wizard::EventLine,
        "Send the event as `name ; end time ; description`\n\
         (time as YYYY-MM-DD HH:MM:SS on the Europe server; description \
         optional)."
          .to_owned(),
      ),
    }
  }

  /// Feed one message into the machine.
  pub fn step(self, input: WizardInput<'_>, offsets: OffsetSnapshot) -> Step {
    match (self, input) {
      (Wizard::TitleAndName { section }, WizardInput::Text(text)) => {
        let Some((title, name)) = split_pair(text) else {
          return Step::Prompt {
            next:  Wizard::TitleAndName { section },
            reply: "That needs a ` ; ` between the title and the name. \
                    Try again."
              .to_owned(),
          };
        };
        let draft = Draft {
          section,
          content: NewContent {
            title: Some(title),
            name: Some(name),
            ..NewContent::default()
          },
        };
        advance_to_region(draft, Region::Asia)
      }

      (Wizard::TitleOnly { section }, WizardInput::Text(text)) => {
        let draft = Draft {
          section,
          content: NewContent {
            title: Some(text.trim().to_owned()),
            ..NewContent::default()
          },
        };
        advance_to_region(draft, Region::Asia)
      }

      (Wizard::EventLine, WizardInput::Text(text)) => {
        let mut parts = text.splitn(3, ';').map(str::trim);
        let (Some(name), Some(time)) = (parts.next(), parts.next()) else {
          return Step::Prompt {
            next:  Wizard::EventLine,
            reply: "Format: `name ; end time ; description`. Try again."
              .to_owned(),
          };
        };
        let description = parts.next().unwrap_or("");
        let end = match parse_local(time, offsets.get(Region::Europe)) {
          Ok(end) => end,
          Err(_) => {
            return Step::Prompt {
              next:  Wizard::EventLine,
              reply: time_format_reply(Region::Europe),
            };
          }
        };
        let mut content = NewContent {
          name: Some(name.to_owned()),
          ..NewContent::default()
        };
        if !description.is_empty() {
          content.description = Some(description.to_owned());
        }
        content.expires.set(Region::Europe, end);
        Step::Finished { section: Section::Events, content }
      }

      (Wizard::RegionTime { mut draft, region }, WizardInput::Text(text)) => {
        let end = match parse_local(text.trim(), offsets.get(region)) {
          Ok(end) => end,
          Err(_) => {
            return Step::Prompt {
              next:  Wizard::RegionTime { draft, region },
              reply: time_format_reply(region),
            };
          }
        };
        draft.content.expires.set(region, end);
        match next_region(region) {
          Some(next) => advance_to_region(draft, next),
          None => Step::Prompt {
            next:  Wizard::Photo { draft },
            reply: "Send the promotional image:".to_owned(),
          },
        }
      }

      (Wizard::Photo { mut draft }, WizardInput::Photo { file_id }) => {
        draft.content.image_ref = Some(file_id.to_owned());
        Step::Finished { section: draft.section, content: draft.content }
      }

      (state @ Wizard::Photo { .. }, WizardInput::Text(_)) => Step::Prompt {
        next:  state,
        reply: "Send a photo to finish.".to_owned(),
      },

      (state, WizardInput::Photo { .. }) => Step::Prompt {
        next:  state,
        reply: "Expected text here, not a photo.".to_owned(),
      },
    }
  }
}

fn advance_to_region(draft: Draft, region: Region) -> Step {
  let reply = format!(
    "Send the {} server end time (YYYY-MM-DD HH:MM:SS):",
    region.display_name()
  );
  Step::Prompt { next: Wizard::RegionTime { draft, region }, reply }
}

fn next_region(region: Region) -> Option<Region> {
  match region {
    Region::Asia => Some(Region::Europe),
    Region::Europe => Some(Region::America),
    Region::America => None,
  }
}

fn time_format_reply(region: Region) -> String {
  format!(
    "That doesn't look like YYYY-MM-DD HH:MM:SS. Send the {} server \
     time again.",
    region.display_name()
  )
}

fn split_pair(text: &str) -> Option<(String, String)> {
  let (left, right) = text.split_once(';')?;
  let (left, right) = (left.trim(), right.trim());
  if left.is_empty() || right.is_empty() {
    return None;
  }
  Some((left.to_owned(), right.to_owned()))
}
