use std::fmt::Write;

use serde::Deserialize;

use super::{AnalyzeRequest, JudgeError, Verdict};
use crate::model::{ChangedSymbol, DocSegment};

/// Characters of each candidate segment shown in a relevance prompt.
const CANDIDATE_PREVIEW_CHARS: usize = 500;

pub const CONSISTENCY_SYSTEM_PROMPT: &str = "You are a code-documentation consistency checker. \
Decide whether the given documentation matches the code implementation.

First decide whether the documentation is describing THIS specific code symbol.

Answer in JSON with these fields:
- related: boolean, whether the documentation is specifically about this symbol
- consistent: boolean, whether documentation and code agree (true when not related)
- confidence: number between 0 and 1
- reason: string explaining the judgment
- suggestion: string with a fix when inconsistent

Guidelines:
1. If the documentation is about a different symbol or topic, set related=false and consistent=true.
2. Only mark inconsistent when the documentation IS about this code but describes it incorrectly.
3. Judge business logic, not code style.
4. Values, thresholds and conditions must match exactly.
5. Documented behaviour missing from the code is inconsistent.
6. Extra behaviour in the code that the documentation omits is acceptable.";

pub const RELEVANCE_SYSTEM_PROMPT: &str = "You are a code-documentation relevance expert. \
Decide which documentation segments specifically describe a given code symbol.

Answer in JSON: {\"relevant\": [indices of relevant segments]}

Guidelines:
1. A segment is relevant if it describes THIS function, type, constant or variable.
2. A segment is relevant if it contains usage examples of THIS symbol.
3. A segment is not relevant if it only mentions the name in passing.
4. A segment is not relevant if it describes a different, similarly named symbol.
5. When in doubt, include the segment.";

pub fn build_analyze_prompt(request: &AnalyzeRequest<'_>) -> String {
    format!(
        "Check whether the following documentation matches the code implementation.

## Documentation
{doc}

## Code Implementation
File: {file}
Symbol: {symbol}

```go
{code}
```

Step 1: decide whether this documentation specifically describes \"{symbol}\".
Step 2: if it does not, answer {{\"related\": false, \"consistent\": true, ...}}.
Step 3: if it does, check whether the description matches the implementation.

Answer in JSON.",
        doc = request.doc_content,
        file = request.code_file,
        symbol = request.code_symbol,
        code = request.code_content,
    )
}

pub fn build_relevance_prompt(symbol: &ChangedSymbol, candidates: &[DocSegment]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "## Code Symbol");
    let _ = writeln!(prompt, "Name: {}", symbol.name);
    let _ = writeln!(prompt, "Kind: {}", symbol.kind);
    let _ = writeln!(prompt, "File: {}\n", symbol.file);
    let _ = writeln!(prompt, "```go\n{}\n```\n", symbol.code());

    let _ = writeln!(prompt, "## Candidate Documentation Segments\n");
    for (i, seg) in candidates.iter().enumerate() {
        let _ = writeln!(prompt, "[{i}] {} - {}", seg.file, seg.heading);
        let _ = writeln!(prompt, "{}\n", preview(&seg.content));
    }

    prompt.push_str("Which segments (by index) specifically describe this code symbol?\n");
    prompt.push_str("Answer in JSON: {\"relevant\": [list of indices]}");
    prompt
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(CANDIDATE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// The outermost `{...}` span of a reply that may carry prose around its JSON.
fn json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

pub fn parse_verdict(reply: &str) -> Result<Verdict, JudgeError> {
    let json = json_object(reply)
        .ok_or_else(|| JudgeError::InvalidResponse(format!("no JSON object in reply: {reply}")))?;
    serde_json::from_str::<Verdict>(json)
        .map(Verdict::normalized)
        .map_err(|e| JudgeError::InvalidResponse(e.to_string()))
}

#[derive(Deserialize)]
struct RelevanceReply {
    #[serde(default)]
    relevant: Vec<i64>,
}

/// Relevant indices below `candidates`, deduplicated in reply order.
pub fn parse_relevant_indices(reply: &str, candidates: usize) -> Result<Vec<usize>, JudgeError> {
    let json = json_object(reply)
        .ok_or_else(|| JudgeError::InvalidResponse(format!("no JSON object in reply: {reply}")))?;
    let parsed: RelevanceReply =
        serde_json::from_str(json).map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;

    let mut indices = Vec::new();
    for idx in parsed.relevant {
        let Ok(idx) = usize::try_from(idx) else {
            continue;
        };
        if idx < candidates && !indices.contains(&idx) {
            indices.push(idx);
        }
    }
    Ok(indices)
}
