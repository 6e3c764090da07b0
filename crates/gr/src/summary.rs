use crate::cli::SummaryArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::source::load_change;
use crate::ui;
use gr_core::{ChangeRecord, SummaryFilter, SummaryFormat, render_summary};
use gr_vcs::GitCli;

pub fn run(args: &SummaryArgs, settings: &Settings, git: &GitCli) -> Result<(), CliError> {
    let change = load_change(
        &args.source.source(),
        args.source.policy(),
        args.source.save_change.as_deref(),
        &settings.ssh,
        git,
    )?;
    let filter = SummaryFilter {
        patch_set: args.filter.patchset.as_deref(),
        file: args.filter.file.as_deref(),
    };

    let sections = render_sections(&change, &args.formats, filter)?;
    let headed = sections.len() > 1;
    for (format, text) in &sections {
        if headed {
            println!("\n{}\n", header(*format));
        }
        println!("{text}");
    }

    if let Some(path) = &args.summary_file {
        let body: String = sections
            .iter()
            .map(|(format, text)| format!("{}\n\n{text}\n\n", header(*format)))
            .collect();
        std::fs::write(path, body)
            .map_err(|err| CliError::io(format!("failed to write {}", path.display()), err))?;
        ui::success(format_args!("Summary written to {}", path.display()));
    }
    Ok(())
}

fn render_sections(
    change: &ChangeRecord,
    formats: &[SummaryFormat],
    filter: SummaryFilter<'_>,
) -> Result<Vec<(SummaryFormat, String)>, CliError> {
    let mut seen = Vec::new();
    let mut sections = Vec::new();
    for format in formats {
        if seen.contains(format) {
            continue;
        }
        seen.push(*format);
        sections.push((*format, render_summary(change, *format, filter)?));
    }
    Ok(sections)
}

fn header(format: SummaryFormat) -> String {
    format!("--- {} SUMMARY ---", format.to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_formats_render_once() {
        let value = json!({"number": 1, "subject": "s"});
        let change = ChangeRecord::from_json(value.as_object().unwrap());
        let sections = render_sections(
            &change,
            &[SummaryFormat::Text, SummaryFormat::Json, SummaryFormat::Text],
            SummaryFilter::default(),
        )
        .unwrap();
        let formats: Vec<_> = sections.iter().map(|(f, _)| *f).collect();
        assert_eq!(formats, vec![SummaryFormat::Text, SummaryFormat::Json]);
        assert!(sections[0].1.starts_with("Change 1: s"));
    }

    #[test]
    fn test_header() {
        assert_eq!(header(SummaryFormat::Markdown), "--- MARKDOWN SUMMARY ---");
    }
}
