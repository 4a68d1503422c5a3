use indicatif::{style::TemplateError, ProgressBar, ProgressStyle};

pub fn bar(header: String, length: u64) -> Result<ProgressBar, TemplateError> {
    let pb = ProgressBar::new(length);
    pb.set_prefix(header);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}]")?.progress_chars("#>-"),
    );
    Ok(pb)
}
