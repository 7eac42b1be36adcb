//! Server-rendered HTML pages. Every dynamic value goes through
//! `html_escape` before it reaches the markup.

use axum::response::Html;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::calendar::CalendarEvent;
use crate::common::i18n::translate;
use crate::tasks::Task;

fn page(locale: &str, title: &str, head_extra: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link rel="manifest" href="/manifest.json">
    <title>{title}</title>
    {head_extra}
</head>
<body>
{body}
</body>
</html>"#,
        lang = encode_double_quoted_attribute(locale),
        title = encode_text(title),
        head_extra = head_extra,
        body = body,
    ))
}

/// Generic error page used for HTML clients
pub fn error_page(locale: &str, message: &str) -> Html<String> {
    let title = translate(locale, "app.title");
    let body = format!(
        r#"<main class="error">
    <h1>{}</h1>
    <p><a href="/">{}</a></p>
</main>"#,
        encode_text(message),
        encode_text(title),
    );
    page(locale, title, "", &body)
}

pub fn landing_page(locale: &str, flash: Option<&str>) -> Html<String> {
    let title = translate(locale, "app.title");
    let flash_html = flash
        .map(|f| format!(r#"<p class="flash" role="alert">{}</p>"#, encode_text(f)))
        .unwrap_or_default();

    let body = format!(
        r#"<main class="landing">
    <h1>{title}</h1>
    <p>{tagline}</p>
    {flash_html}
    <p><a class="button" href="/auth/login">{sign_in}</a></p>
</main>"#,
        title = encode_text(title),
        tagline = encode_text(translate(locale, "landing.tagline")),
        flash_html = flash_html,
        sign_in = encode_text(translate(locale, "landing.sign_in")),
    );

    page(locale, title, "", &body)
}

/// Everything the dashboard needs, gathered by the handler
pub struct DashboardView<'a> {
    pub locale: &'a str,
    pub user_name: &'a str,
    pub csrf_token: &'a str,
    pub nonce: &'a str,
    pub flash: Option<&'a str>,
    pub events: &'a [CalendarEvent],
    pub tasks: &'a [Task],
}

fn event_time(event: &CalendarEvent) -> String {
    if event.all_day {
        return String::new();
    }
    // Stored as RFC 3339 UTC; the clock part is enough on a one-day view
    event
        .start_time
        .get(11..16)
        .map(|t| format!("{} UTC", t))
        .unwrap_or_default()
}

pub fn dashboard_page(view: &DashboardView<'_>) -> Html<String> {
    let locale = view.locale;
    let title = translate(locale, "app.title");

    let events_html = if view.events.is_empty() {
        format!("<p>{}</p>", encode_text(translate(locale, "dashboard.no_events")))
    } else {
        let items: String = view
            .events
            .iter()
            .map(|e| {
                format!(
                    "<li><time>{}</time> {}</li>",
                    encode_text(&event_time(e)),
                    encode_text(&e.title)
                )
            })
            .collect();
        format!("<ul class=\"events\">{}</ul>", items)
    };

    let tasks_html: String = view
        .tasks
        .iter()
        .map(|t| {
            format!(
                r#"<li data-task-id="{}" class="priority-{}">{}{}</li>"#,
                encode_double_quoted_attribute(&t.id),
                encode_double_quoted_attribute(&t.priority),
                encode_text(&t.title),
                t.due_date
                    .as_deref()
                    .map(|d| format!(" <small>{}</small>", encode_text(d)))
                    .unwrap_or_default(),
            )
        })
        .collect();

    let flash_html = view
        .flash
        .map(|f| format!(r#"<p class="flash" role="alert">{}</p>"#, encode_text(f)))
        .unwrap_or_default();

    let head_extra = format!(
        r#"<meta name="csrf-token" content="{}">"#,
        encode_double_quoted_attribute(view.csrf_token)
    );

    let body = format!(
        r#"<header>
    <h1>{greeting}, {name}</h1>
    <form method="post" action="/auth/logout">
        <input type="hidden" name="csrf_token" value="{csrf}">
        <button type="submit">{sign_out}</button>
    </form>
</header>
{flash_html}
<main class="dashboard">
    <section id="today">
        <h2>{today}</h2>
        {events_html}
    </section>
    <section id="tasks">
        <h2>{open_tasks}</h2>
        <ul class="tasks">{tasks_html}</ul>
    </section>
    <section id="schedule"></section>
</main>
<script nonce="{nonce}">
    window.csrfToken = document.querySelector('meta[name="csrf-token"]').content;
    if ('serviceWorker' in navigator) {{
        navigator.serviceWorker.register('/service-worker.js');
    }}
</script>"#,
        greeting = encode_text(translate(locale, "dashboard.greeting")),
        name = encode_text(view.user_name),
        csrf = encode_double_quoted_attribute(view.csrf_token),
        sign_out = encode_text(translate(locale, "dashboard.sign_out")),
        flash_html = flash_html,
        today = encode_text(translate(locale, "dashboard.today")),
        events_html = events_html,
        open_tasks = encode_text(translate(locale, "dashboard.open_tasks")),
        tasks_html = tasks_html,
        nonce = encode_double_quoted_attribute(view.nonce),
    );

    page(locale, title, &head_extra, &body)
}

pub const MANIFEST_JSON: &str = r##"{
  "name": "Homebase",
  "short_name": "Homebase",
  "start_url": "/dashboard",
  "scope": "/",
  "display": "standalone",
  "background_color": "#ffffff",
  "theme_color": "#4F46E5"
}"##;

/// Push messages carry no payload; the worker pulls them from the server
pub const SERVICE_WORKER_JS: &str = r#"self.addEventListener('push', (event) => {
  event.waitUntil(
    fetch('/notifications/pending', { credentials: 'same-origin', headers: { 'Accept': 'application/json' } })
      .then((response) => (response.ok ? response.json() : []))
      .then((notifications) => Promise.all(
        notifications.map((n) => self.registration.showNotification(n.title, {
          body: n.body,
          data: { url: n.url || '/dashboard' },
        }))
      ))
  );
});

self.addEventListener('notificationclick', (event) => {
  event.notification.close();
  event.waitUntil(clients.openWindow(event.notification.data.url));
});
"#;
