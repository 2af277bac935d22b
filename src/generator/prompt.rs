use std::path::PathBuf;

use super::placeholder::display_path;

pub const SYSTEM_INSTRUCTION: &str = r#"You are an FFmpeg expert. Your task is to understand the user's request and
produce the correct FFmpeg command. Return a JSON object in the exact form:

{
  "exe":"ffmpeg",
  "args":[]
}
Return only valid JSON, no explanations, no text outside the JSON."#;

const OVERRIDE_NOTE: &str = "override filename if user explicitly requests it in the prompt";

pub fn build_user_message(prompt: &str, files: &[String], placeholders: &[PathBuf]) -> String {
    let mut lines = vec![format!("User request: {}", quote(prompt.trim()))];

    if let ([file], [placeholder]) = (files, placeholders) {
        lines.push(format!("Input file src: {}", quote(file)));
        lines.push(format!(
            "Output filename placeholder: {} #{OVERRIDE_NOTE}",
            quote(display_path(placeholder).as_str())
        ));
    } else {
        lines.push(format!("Input files src ({}):", files.len()));
        for (idx, file) in files.iter().enumerate() {
            lines.push(format!("  {}. {}", idx + 1, quote(file)));
        }
        lines.push(String::from(
            "Output filename placeholders (one per input file, same order):",
        ));
        for (idx, placeholder) in placeholders.iter().enumerate() {
            lines.push(format!(
                "  {}. {}",
                idx + 1,
                quote(display_path(placeholder).as_str())
            ));
        }
        lines.push(format!("#{OVERRIDE_NOTE}"));
    }

    lines.join("\n")
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_message_uses_singular_wording() {
        let message = build_user_message(
            "trim the first 10 seconds",
            &[String::from("/in/clip.mp4")],
            &[PathBuf::from("/out/clip1")],
        );
        assert!(message.contains("User request: \"trim the first 10 seconds\""));
        assert!(message.contains("Input file src: \"/in/clip.mp4\""));
        assert!(message.contains("Output filename placeholder: \"/out/clip1\""));
        assert!(message.contains(OVERRIDE_NOTE));
        assert!(!message.contains("files"));
        assert!(!message.contains("placeholders"));
    }

    #[test]
    fn multi_file_message_lists_every_input_and_placeholder() {
        let message = build_user_message(
            "concatenate these",
            &[String::from("/a/one.mp4"), String::from("/b/two.mp4")],
            &[PathBuf::from("/out/one7_1"), PathBuf::from("/out/two7_2")],
        );
        assert!(message.contains("Input files src (2):"));
        assert!(message.contains("1. \"/a/one.mp4\""));
        assert!(message.contains("2. \"/b/two.mp4\""));
        assert!(message.contains("Output filename placeholders"));
        assert!(message.contains("2. \"/out/two7_2\""));
    }

    #[test]
    fn prompt_quotes_are_escaped() {
        let message = build_user_message(
            "name it \"final\"",
            &[String::from("/in/a.mov")],
            &[PathBuf::from("/out/a1")],
        );
        assert!(message.contains(r#"User request: "name it \"final\"""#));
    }
}
