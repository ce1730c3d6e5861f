use std::sync::OnceLock;
use tera::{Context, Tera};

pub const CERTIFICATE_EMAIL: &str = "certificate_email.txt";

const CERTIFICATE_EMAIL_BODY: &str = r#"Congratulations {{ student_name }}!

Please find your OriginHash certificate for "{{ course_name }}" attached.

Certificate ID: {{ unique_id }}
Anyone can verify it at {{ verify_url }} using this ID.
"#;

static TERA: OnceLock<Tera> = OnceLock::new();

/// Built-in templates, overridable by files in `templates/`.
pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_template(CERTIFICATE_EMAIL, CERTIFICATE_EMAIL_BODY) {
            tracing::error!("Built-in email template is invalid: {}", e);
        }

        let template_dir = std::path::Path::new("templates");
        if let Ok(entries) = std::fs::read_dir(template_dir) {
            let overrides = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
                .filter_map(|p| {
                    let name = p.file_name()?.to_str()?.to_string();
                    Some((p, Some(name)))
                });
            if let Err(e) = tera.add_template_files(overrides) {
                tracing::warn!("Ignoring template overrides: {}", e);
            }
        }
        tera
    })
}

pub fn render(name: &str, ctx: &Context) -> Result<String, tera::Error> {
    get_tera().render(name, ctx)
}
