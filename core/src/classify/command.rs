use super::{check_score, ClassifyError, LabelScore, SentenceClassifier};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs an external zero-shot classifier once per sentence.
///
/// The command receives a JSON request on stdin:
///
/// ```json
/// {"sequence": "...", "candidate_labels": ["..."], "multi_label": true}
/// ```
///
/// and must print `{"labels": [...], "scores": [...]}` on stdout. The JSON may
/// be wrapped in a fenced block or surrounded by other output.
///
/// The command line is split on whitespace and executed directly, never
/// through a shell. It should only come from trusted configuration.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    sequence: &'a str,
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

#[derive(Deserialize)]
struct ClassifyReply {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line.
    pub fn parse(command_line: &str) -> Result<Self, ClassifyError> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next().ok_or_else(|| {
            ClassifyError::CommandFailed("Classifier command is empty".to_owned())
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// True when the program exists as a path or resolves on `PATH`.
    pub fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    fn run(&self, request: &[u8]) -> Result<String, ClassifyError> {
        let program =
            find_executable(&self.program).ok_or_else(|| ClassifyError::NotFound(self.program.clone()))?;

        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClassifyError::CommandFailed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifyError::CommandFailed(stderr.trim().to_owned()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        Ok(stdout)
    }
}

impl SentenceClassifier for CommandClassifier {
    fn classify(&self, sentence: &str, labels: &[&str]) -> Result<Vec<LabelScore>, ClassifyError> {
        let request = serde_json::to_vec(&ClassifyRequest {
            sequence: sentence,
            candidate_labels: labels,
            multi_label: true,
        })
        .map_err(|e| ClassifyError::ParseError(e.to_string()))?;

        let output = self.run(&request)?;
        parse_reply(&output, labels)
    }
}

/// Locate a program: an existing path is used as-is, otherwise it is looked
/// up with `which` (or `where` on Windows).
pub(crate) fn find_executable(program: &str) -> Option<String> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return Path::new(program).is_file().then(|| program.to_owned());
    }

    let which_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = Command::new(which_cmd).arg(program).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_owned();
    (!path.is_empty()).then_some(path)
}

/// Pull the JSON object out of the oracle's output.
fn extract_json(output: &str) -> Result<&str, ClassifyError> {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_marker = &trimmed[start + 7..];
        return Ok(after_marker
            .find("```")
            .map_or(after_marker, |end| &after_marker[..end])
            .trim());
    }
    if let Some(start) = trimmed.find("```") {
        let after_marker = &trimmed[start + 3..];
        let after_newline = after_marker
            .find('\n')
            .map_or(after_marker, |i| &after_marker[i + 1..]);
        return Ok(after_newline
            .find("```")
            .map_or(after_newline, |end| &after_newline[..end])
            .trim());
    }
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&trimmed[start..=end]),
        (Some(_), _) => Err(ClassifyError::ParseError(
            "Could not find complete JSON object".to_owned(),
        )),
        _ => Err(ClassifyError::ParseError(format!(
            "No JSON found in output: {}",
            trimmed.chars().take(200).collect::<String>()
        ))),
    }
}

/// Validate the reply against the requested labels and sort by descending
/// score.
fn parse_reply(output: &str, requested: &[&str]) -> Result<Vec<LabelScore>, ClassifyError> {
    let json_str = extract_json(output)?;
    let reply: ClassifyReply = serde_json::from_str(json_str).map_err(|e| {
        ClassifyError::ParseError(format!(
            "JSON parse error: {}. Input: {}",
            e,
            json_str.chars().take(500).collect::<String>()
        ))
    })?;

    if reply.labels.len() != reply.scores.len() {
        return Err(ClassifyError::ParseError(format!(
            "{} labels but {} scores",
            reply.labels.len(),
            reply.scores.len()
        )));
    }

    let mut scores = Vec::with_capacity(reply.labels.len());
    for (label, score) in reply.labels.into_iter().zip(reply.scores) {
        check_score(&label, score)?;
        if !requested.contains(&label.as_str()) {
            log::warn!("[classifier] Filtered out label not in request: '{label}'");
            continue;
        }
        scores.push(LabelScore { label, score });
    }
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}
