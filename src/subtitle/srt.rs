// SRT reassembly
use super::{collapse_blank_lines, parser::normalize_newlines, Cue, CueBody};

/// Byte-order mark prepended to written files.
pub const BOM: &str = "\u{feff}";

/// Render cues back into SRT text, one blank line after every block.
///
/// Translatable cues get their header, normalized timing and output text;
/// everything else is written exactly as it was read.
pub fn render_cues(cues: &[Cue]) -> String {
    cues.iter().map(render_cue).collect()
}

fn render_cue(cue: &Cue) -> String {
    match &cue.body {
        CueBody::Timed(timed) if cue.is_translatable() => {
            let text = timed
                .translated_text
                .as_deref()
                .map(|t| collapse_blank_lines(&normalize_newlines(t)))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| timed.source_text.clone());

            let mut block = String::new();
            for line in &timed.header {
                block.push_str(line);
                block.push('\n');
            }
            block.push_str(&timed.timing);
            block.push('\n');
            block.push_str(text.trim_end_matches('\n'));
            block.push_str("\n\n");
            block
        }
        CueBody::Timed(_) | CueBody::Passthrough => format!("{}\n\n", cue.raw),
    }
}

/// Final file bytes: BOM followed by UTF-8 text.
pub fn encode_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BOM.len() + text.len());
    bytes.extend_from_slice(BOM.as_bytes());
    bytes.extend_from_slice(text.as_bytes());
    bytes
}
