use serde::{Deserialize, Serialize};

use workproof_types::{TaskMetrics, TaskType};

/// One tool invocation inside an agent session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Tool argument, e.g. the target path of a write.
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub success: bool,
}

/// A unit of agent activity as reported by the upstream telemetry source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tokens_input: u64,
    #[serde(default)]
    pub tokens_output: u64,
    #[serde(default)]
    pub tools: Vec<ToolCall>,
}

const CODE_KEYWORDS: &[&str] = &["func ", "def ", "class ", "const ", "let ", "import ", "package "];
const DEBUG_KEYWORDS: &[&str] = &["error", "bug", "fix", "debug", "exception", "traceback"];
const DEPLOY_KEYWORDS: &[&str] = &["deploy", "docker", "kubernetes", "kubectl", "npm run", "build", "serve"];
const DOC_KEYWORDS: &[&str] = &["readme", "document", "comment", "explain", "describe"];
const CODE_EXTENSIONS: &[&str] = &[".go", ".js", ".ts", ".py", ".rs", ".java", ".cpp", ".c", ".h", ".cs"];

/// Derive a task type from session content, then tool usage. Keyword groups are
/// checked in priority order; anything unmatched is research.
pub fn classify(event: &SessionEvent) -> TaskType {
    let content = event.content.to_lowercase();
    let groups = [
        (CODE_KEYWORDS, TaskType::Coding),
        (DEBUG_KEYWORDS, TaskType::Debug),
        (DEPLOY_KEYWORDS, TaskType::Deploy),
        (DOC_KEYWORDS, TaskType::Doc),
    ];
    for (keywords, task_type) in groups {
        if keywords.iter().any(|kw| content.contains(kw)) {
            return task_type;
        }
    }

    for tool in &event.tools {
        if tool.name.starts_with("exec") || tool.name.starts_with("bash") {
            return TaskType::Coding;
        }
        if tool.name.starts_with("write") || tool.name.starts_with("edit") {
            return if is_code_file(&tool.input) {
                TaskType::Coding
            } else {
                TaskType::Writing
            };
        }
    }

    TaskType::Research
}

/// Count non-empty lines that are not line or block comment openers.
pub fn estimate_code_lines(output: &str) -> u64 {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with('#') && !l.starts_with("/*"))
        .count() as u64
}

pub fn is_code_file(path: &str) -> bool {
    CODE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Completion metrics for a session: token counts plus code produced by
/// successful shell and write tools.
pub fn session_metrics(event: &SessionEvent) -> TaskMetrics {
    let mut metrics = TaskMetrics {
        tokens_input: event.tokens_input,
        tokens_output: event.tokens_output,
        ..Default::default()
    };
    for tool in event.tools.iter().filter(|t| t.success) {
        match tool.name.as_str() {
            "exec" | "bash" | "powershell" => {
                metrics.code_lines += estimate_code_lines(&tool.output);
            }
            "write" | "edit" => {
                metrics.code_files += 1;
                metrics.code_lines += estimate_code_lines(&tool.output);
            }
            _ => {}
        }
    }
    metrics
}
