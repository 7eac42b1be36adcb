//! Minimal message catalogue for the server-rendered pages

pub const DEFAULT_LOCALE: &str = "en";
pub const SUPPORTED_LOCALES: &[&str] = &["en", "es"];

pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// Looks up `key` for `locale`, falling back to English and then to the key itself
pub fn translate(locale: &str, key: &'static str) -> &'static str {
    let lookup = |locale: &str| -> Option<&'static str> {
        let text = match (locale, key) {
            ("en", "app.title") => "Homebase",
            ("en", "landing.tagline") => "Our calendar, tasks and plans in one place.",
            ("en", "landing.sign_in") => "Sign in with Google",
            ("en", "dashboard.greeting") => "Welcome back",
            ("en", "dashboard.today") => "Today",
            ("en", "dashboard.no_events") => "Nothing scheduled today.",
            ("en", "dashboard.open_tasks") => "Open tasks",
            ("en", "dashboard.sign_out") => "Sign out",
            ("en", "error.not_found") => "Page not found",
            ("en", "error.server") => "Something went wrong",
            ("en", "error.csrf") => "Your session expired. Reload the page and try again.",
            ("en", "auth.login_failed") => "Sign-in failed. Please try again.",
            ("en", "auth.not_authorized") => "This account is not authorized to use Homebase.",
            ("es", "app.title") => "Homebase",
            ("es", "landing.tagline") => "Nuestro calendario, tareas y planes en un solo lugar.",
            ("es", "landing.sign_in") => "Iniciar sesión con Google",
            ("es", "dashboard.greeting") => "Bienvenido de nuevo",
            ("es", "dashboard.today") => "Hoy",
            ("es", "dashboard.no_events") => "Nada programado para hoy.",
            ("es", "dashboard.open_tasks") => "Tareas pendientes",
            ("es", "dashboard.sign_out") => "Cerrar sesión",
            ("es", "error.not_found") => "Página no encontrada",
            ("es", "error.server") => "Algo salió mal",
            ("es", "error.csrf") => "Tu sesión expiró. Recarga la página e inténtalo de nuevo.",
            ("es", "auth.login_failed") => "No se pudo iniciar sesión. Inténtalo de nuevo.",
            ("es", "auth.not_authorized") => "Esta cuenta no está autorizada para usar Homebase.",
            _ => return None,
        };
        Some(text)
    };

    lookup(locale)
        .or_else(|| lookup(DEFAULT_LOCALE))
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_with_fallback() {
        assert_eq!(translate("es", "dashboard.today"), "Hoy");
        assert_eq!(translate("fr", "dashboard.today"), "Today");
        assert_eq!(translate("en", "missing.key"), "missing.key");
    }

    #[test]
    fn test_supported_locales() {
        assert!(is_supported("en"));
        assert!(is_supported("es"));
        assert!(!is_supported("de"));
    }
}
