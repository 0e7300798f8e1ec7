// Page rendering. Every function here is pure: template text in, HTML out.
use crate::models::{Category, ProgressRecord, SearchContext, TaskStatus};

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn message_block(class: &str, message: Option<&str>) -> String {
    message
        .filter(|m| !m.is_empty())
        .map(|m| format!(r#"<div class="{}">{}</div>"#, class, escape_html(m)))
        .unwrap_or_default()
}

pub fn render_login_page(template: &str, error: Option<&str>) -> String {
    template.replace("{{error}}", &message_block("error", error))
}

/// Banner describing the user's current task, if there is one.
pub fn status_message(username: &str, current: Option<&ProgressRecord>) -> Option<String> {
    let record = current?;
    if record.is_running() {
        return Some(format!(
            "A task is already running for {}. Please wait until it is complete.",
            username
        ));
    }
    match record.status {
        Some(TaskStatus::Failed) => Some(
            "Your last task could not be completed and no email was sent. You can submit a new request."
                .to_string(),
        ),
        _ => Some("Task completed successfully! You can now submit a new request.".to_string()),
    }
}

fn category_options(selected: Category) -> String {
    Category::ALL
        .iter()
        .map(|c| {
            format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape_html(c.label()),
                if *c == selected { " selected" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The search form for `context`, with submission disabled while `current` is running.
pub fn render_search_page(
    template: &str,
    username: &str,
    context: &SearchContext,
    current: Option<&ProgressRecord>,
    notice: Option<&str>,
) -> String {
    let running = current.is_some_and(ProgressRecord::is_running);
    let status = status_message(username, current);
    let status_class = if running { "warning" } else { "success" };

    template
        .replace("{{username}}", &escape_html(username))
        .replace("{{notice}}", &message_block("notice", notice))
        .replace("{{status}}", &message_block(status_class, status.as_deref()))
        .replace("{{email}}", &escape_html(&context.email))
        .replace("{{keywords}}", &escape_html(&context.keywords))
        .replace("{{category_options}}", &category_options(context.selected_option))
        .replace("{{submit_disabled}}", if running { "disabled" } else { "" })
}

pub fn render_task_rows(tasks: &[(String, ProgressRecord)]) -> String {
    tasks
        .iter()
        .map(|(task_id, record)| {
            let status = match (record.is_running(), record.status) {
                (true, _) => "Running",
                (false, Some(TaskStatus::Failed)) => "Failed",
                (false, _) => "Completed",
            };
            let results = match record.results_found {
                Some(true) => format!(r#"<a href="/download/{}">Download</a>"#, escape_html(task_id)),
                Some(false) => "No results".to_string(),
                None => "-".to_string(),
            };
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
                record
                    .submitted_at
                    .map_or("-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                escape_html(&record.keywords.join(", ")),
                record.selected_option.map(|c| escape_html(c.label())).unwrap_or_default(),
                status,
                record
                    .completed_at
                    .map_or("Pending".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                results
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
