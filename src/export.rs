use crate::comments::Comment;

const DEFAULT_TITLE: &str = "Review comments";

/// Formats comments as a numbered plain-text list suitable for pasting into
/// a chat or review thread.
pub fn export_plain(comments: &[Comment], title: &str) -> String {
    let title = if title.is_empty() { DEFAULT_TITLE } else { title };
    let mut lines = vec![title.to_string(), String::new()];

    for (index, comment) in comments.iter().enumerate() {
        lines.push(format!(
            "{}) {} {}:{}",
            index + 1,
            comment.path,
            comment.side,
            comment.line
        ));
        lines.push(format!("   Comment: {}", comment.body));

        if !comment.context_before.is_empty() || !comment.context_after.is_empty() {
            lines.push("   Context:".to_string());
            lines.extend(
                comment
                    .context_before
                    .iter()
                    .map(|line| format!("     {line}")),
            );
            if let Some((target, following)) = comment.context_after.split_first() {
                lines.push(format!("     > {target}"));
                lines.extend(following.iter().map(|line| format!("     {line}")));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end_matches('\n').to_string()
}
