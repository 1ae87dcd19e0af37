//! Permission gate contract
//!
//! The patch tool asks for one decision per changed path before anything
//! is written. The service is handed to the tool at construction; which
//! surface answers (terminal prompt, automode) is the caller's choice.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use owo_colors::OwoColorize;
use serde::Serialize;

/// Kind of change a request asks to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction
{
    Create,
    Delete,
    Modify,
}

impl PermissionAction
{
    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            PermissionAction::Create => "create",
            PermissionAction::Delete => "delete",
            PermissionAction::Modify => "modify",
        }
    }

    /// Present participle used in denial messages
    pub fn verb(&self) -> &'static str
    {
        match self
        {
            PermissionAction::Create => "creating",
            PermissionAction::Delete => "deleting",
            PermissionAction::Modify => "modifying",
        }
    }
}

/// One grant request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRequest
{
    pub tool_name: String,
    pub action: PermissionAction,
    /// Target path as written in the patch
    pub path: String,
    /// Directory containing the target
    pub dir: String,
    pub description: String,
    pub diff_preview: String,
}

/// Synchronous grant/deny decision
pub trait PermissionService: Send + Sync
{
    fn request(
        &self,
        req: &PermissionRequest,
    ) -> bool;
}

/// Grants everything (automode)
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl PermissionService for AutoApprove
{
    fn request(
        &self,
        _req: &PermissionRequest,
    ) -> bool
    {
        true
    }
}

/// Denies everything
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl PermissionService for DenyAll
{
    fn request(
        &self,
        _req: &PermissionRequest,
    ) -> bool
    {
        false
    }
}

/// Asks on the terminal; anything but y/yes is a denial
pub struct TerminalPrompt<R, W>
{
    io: Mutex<(R, W)>,
    color: bool,
}

impl TerminalPrompt<io::BufReader<io::Stdin>, io::Stderr>
{
    pub fn stdio(color: bool) -> Self
    {
        Self::new(io::BufReader::new(io::stdin()), io::stderr(), color)
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(
        input: R,
        output: W,
        color: bool,
    ) -> Self
    {
        Self { io: Mutex::new((input, output)), color }
    }

    fn ask(
        &self,
        req: &PermissionRequest,
    ) -> io::Result<bool>
    {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| io::Error::other("prompt lock poisoned"))?;
        let (input, output) = &mut *guard;

        writeln!(output)?;
        if self.color
        {
            writeln!(output, "{} {}", "Permission required:".yellow().bold(), req.description)?;
        }
        else
        {
            writeln!(output, "Permission required: {}", req.description)?;
        }
        writeln!(output, "  tool: {}  action: {}  dir: {}", req.tool_name, req.action.as_str(), req.dir)?;
        for line in req
            .diff_preview
            .lines()
        {
            match (self.color, line.chars().next())
            {
                (true, Some('+')) => writeln!(output, "  {}", line.green())?,
                (true, Some('-')) => writeln!(output, "  {}", line.red())?,
                _ => writeln!(output, "  {line}")?,
            }
        }
        write!(output, "Allow? [y/N] ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0
        {
            return Ok(false);
        }

        let answer = answer
            .trim()
            .to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

impl<R, W> PermissionService for TerminalPrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn request(
        &self,
        req: &PermissionRequest,
    ) -> bool
    {
        // An unreadable terminal never grants
        self.ask(req)
            .unwrap_or(false)
    }
}
