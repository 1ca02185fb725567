//! Edit scripts
//!
//! A line-oriented command language for driving a session without a
//! pointer: one command per line, `#` starts a comment, double quotes
//! group words. The whole script is parsed before anything runs.

use std::fmt;

use tracing::{debug, warn};

use crate::application::services::chart::{ChartSession, EditOutcome};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DropOutcome, NodeField, NodeUpdate, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomAction {
    In,
    Out,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Template(String),
    Reset,
    Add(String),
    Sibling(String),
    Delete(String),
    Move { source: String, target: String },
    Set { id: String, update: NodeUpdate },
    Collapse(String),
    Expand(String),
    Zoom(ZoomAction),
    Pan(f32, f32),
    Drag { source: String, target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// 1-based source line
    pub line: usize,
    pub command: ScriptCommand,
}

/// How a single step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Applied(String),
    Unchanged,
    Cancelled,
    /// Refused by the chart rules; the script carries on
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub line: usize,
    pub status: StepStatus,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            StepStatus::Applied(detail) => write!(f, "line {}: {}", self.line, detail),
            StepStatus::Unchanged => write!(f, "line {}: no change", self.line),
            StepStatus::Cancelled => write!(f, "line {}: cancelled", self.line),
            StepStatus::Rejected(reason) => write!(f, "line {}: rejected: {}", self.line, reason),
        }
    }
}

/// Split a line into words; quotes group, `\"` and `\\` escape.
fn tokenize(text: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            '#' if !quoted => break,
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    tokens.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_command(tokens: &[String]) -> Result<ScriptCommand, String> {
    let Some((verb, args)) = tokens.split_first() else {
        return Err("empty command".to_string());
    };
    let one = |what: &str| -> Result<String, String> {
        match args {
            [arg] => Ok(arg.clone()),
            _ => Err(format!("{} expects exactly one {}", verb, what)),
        }
    };
    let two = || -> Result<(String, String), String> {
        match args {
            [a, b] => Ok((a.clone(), b.clone())),
            _ => Err(format!("{} expects SOURCE TARGET", verb)),
        }
    };
    let set = |field: NodeField| -> Result<ScriptCommand, String> {
        match args {
            [id, rest @ ..] if !rest.is_empty() => {
                let update = NodeUpdate::parse(field, &rest.join(" ")).map_err(|e| e.to_string())?;
                Ok(ScriptCommand::Set {
                    id: id.clone(),
                    update,
                })
            }
            _ => Err(format!("{} expects ID VALUE", verb)),
        }
    };

    match verb.to_lowercase().as_str() {
        "template" | "load" => match args {
            [] => Err("template expects a NAME".to_string()),
            words => Ok(ScriptCommand::Template(words.join(" "))),
        },
        "reset" if args.is_empty() => Ok(ScriptCommand::Reset),
        "reset" => Err("reset takes no arguments".to_string()),
        "add" => one("PARENT").map(ScriptCommand::Add),
        "sibling" => one("ID").map(ScriptCommand::Sibling),
        "delete" => one("ID").map(ScriptCommand::Delete),
        "move" => two().map(|(source, target)| ScriptCommand::Move { source, target }),
        "drag" => two().map(|(source, target)| ScriptCommand::Drag { source, target }),
        "title" => set(NodeField::Title),
        "assign" => set(NodeField::Assignee),
        "role" => set(NodeField::Role),
        "collapse" => one("ID").map(ScriptCommand::Collapse),
        "expand" => one("ID").map(ScriptCommand::Expand),
        "zoom" => match one("in|out|reset")?.to_lowercase().as_str() {
            "in" => Ok(ScriptCommand::Zoom(ZoomAction::In)),
            "out" => Ok(ScriptCommand::Zoom(ZoomAction::Out)),
            "reset" => Ok(ScriptCommand::Zoom(ZoomAction::Reset)),
            other => Err(format!("unknown zoom action: {}", other)),
        },
        "pan" => {
            let (x, y) = match args {
                [x, y] => (x, y),
                _ => return Err("pan expects X Y".to_string()),
            };
            let num = |s: &String| {
                s.parse::<f32>()
                    .map_err(|_| format!("not a number: {}", s))
            };
            Ok(ScriptCommand::Pan(num(x)?, num(y)?))
        }
        other => Err(format!("unknown command: {}", other)),
    }
}

/// Parse a whole script; the first syntax error aborts with its line.
pub fn parse_script(source: &str) -> ApplicationResult<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    for (idx, text) in source.lines().enumerate() {
        let line = idx + 1;
        let script_err = |message: String| ApplicationError::Script { line, message };
        let tokens = tokenize(text).map_err(script_err)?;
        if tokens.is_empty() {
            continue;
        }
        let command = parse_command(&tokens).map_err(script_err)?;
        lines.push(ScriptLine { line, command });
    }
    Ok(lines)
}

fn from_edit(outcome: EditOutcome, detail: String) -> StepStatus {
    match outcome {
        EditOutcome::Applied => StepStatus::Applied(detail),
        EditOutcome::Unchanged => StepStatus::Unchanged,
        EditOutcome::Cancelled => StepStatus::Cancelled,
    }
}

fn execute(session: &mut ChartSession, command: &ScriptCommand) -> ApplicationResult<StepStatus> {
    use ScriptCommand::*;
    Ok(match command {
        Template(name) => from_edit(session.load_template(name)?, format!("loaded {}", name)),
        Reset => from_edit(session.reset()?, "chart reset".to_string()),
        Add(parent) => {
            let id = session.add_child(parent)?;
            StepStatus::Applied(format!("added {} under {}", id, parent))
        }
        Sibling(of) => {
            let id = session.add_sibling(of)?;
            StepStatus::Applied(format!("added {} beside {}", id, of))
        }
        Delete(id) => from_edit(session.delete(id)?, format!("deleted {}", id)),
        Move { source, target } => from_edit(
            session.move_node(source, target)?,
            format!("moved {} under {}", source, target),
        ),
        Set { id, update } => from_edit(
            session.update(id, update.clone())?,
            format!("updated {}", id),
        ),
        Collapse(id) => from_edit(
            session.set_collapsed(id, true)?,
            format!("collapsed {}", id),
        ),
        Expand(id) => from_edit(
            session.set_collapsed(id, false)?,
            format!("expanded {}", id),
        ),
        Zoom(action) => {
            let zoom = match action {
                ZoomAction::In => session.zoom_in(),
                ZoomAction::Out => session.zoom_out(),
                ZoomAction::Reset => {
                    session.reset_view();
                    session.viewport().zoom()
                }
            };
            StepStatus::Applied(format!("zoom {:.1}", zoom))
        }
        Pan(x, y) => {
            session.pan_to(Vec2::new(*x, *y));
            StepStatus::Applied(format!("pan {} {}", x, y))
        }
        Drag { source, target } => {
            if !session.begin_drag(source) {
                return Ok(StepStatus::Rejected(format!("cannot drag {}", source)));
            }
            session.drag_enter(target);
            match session.drop_on(target)? {
                DropOutcome::Moved => StepStatus::Applied(format!("dragged {} onto {}", source, target)),
                DropOutcome::Unchanged | DropOutcome::Ignored => StepStatus::Unchanged,
            }
        }
    })
}

/// Run parsed lines in order.
///
/// Rejected edits become warnings in the report; any other error stops
/// the run.
pub fn run_script(
    session: &mut ChartSession,
    lines: &[ScriptLine],
) -> ApplicationResult<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(lines.len());
    for line in lines {
        let status = match execute(session, &line.command) {
            Ok(status) => status,
            Err(e) if e.is_rejection() => {
                warn!("line {}: {}", line.line, e);
                StepStatus::Rejected(e.to_string())
            }
            Err(e) => return Err(e),
        };
        debug!("line {}: {:?}", line.line, status);
        reports.push(StepReport {
            line: line.line,
            status,
        });
    }
    Ok(reports)
}
