use serde_json::json;

use super::blocks::insert_block_void;
use super::{delete_selection_in, edit_document, insert_inline_at};
use crate::core::{Attrs, Node};
use crate::extension::{CommandSpec, Extension, NodeRole, NodeSpec, arg_opt_str, arg_str};
use crate::tree::element_at_path;

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];
const DEFAULT_VIDEO_WIDTH: u64 = 640;
const DEFAULT_VIDEO_HEIGHT: u64 = 480;

pub(super) struct ImageExtension;

impl Extension for ImageExtension {
    fn name(&self) -> &'static str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("image", NodeRole::Inline)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("image.insert", "Insert image", |editor, args| {
                let src = arg_str(args, "src")?;
                if src.trim().is_empty() {
                    return Err("Image source is empty".into());
                }
                let alt = arg_opt_str(args, "alt").unwrap_or_else(|| "altText".to_string());

                let registry = editor.registry();
                let sel = editor.selection();
                edit_document(editor, |doc| {
                    let caret = delete_selection_in(doc, registry, sel)?;
                    if element_at_path(doc, &caret.block).is_some_and(|el| el.kind == "code_block") {
                        return Err("Images cannot be placed in a code block".into());
                    }
                    let mut attrs = Attrs::default();
                    attrs.insert("src".into(), json!(src));
                    attrs.insert("alt".into(), json!(alt));
                    let caret = insert_inline_at(doc, &caret, vec![Node::void("image", attrs)])?;
                    Ok(caret.selection(doc))
                })
            })
            .keywords(["image", "picture", "img"])
            .args_example(json!({ "src": "https://example.com/a.png", "alt": "altText" })),
        ]
    }
}

pub(super) struct YoutubeExtension;

impl Extension for YoutubeExtension {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("youtube", NodeRole::Block)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("youtube.insert", "Insert YouTube video", |editor, args| {
                let url = arg_str(args, "src")?;
                let src = youtube_embed_url(&url).ok_or_else(|| format!("Not a YouTube video URL: {url}"))?;
                let dimension = |key: &str, default: u64| {
                    args.and_then(|a| a.get(key))
                        .and_then(|v| v.as_u64())
                        .filter(|v| *v > 0)
                        .unwrap_or(default)
                };
                let mut attrs = Attrs::default();
                attrs.insert("src".into(), json!(src));
                attrs.insert("width".into(), json!(dimension("width", DEFAULT_VIDEO_WIDTH)));
                attrs.insert("height".into(), json!(dimension("height", DEFAULT_VIDEO_HEIGHT)));
                insert_block_void(editor, Node::void("youtube", attrs))
            })
            .keywords(["youtube", "video", "embed"])
            .args_example(json!({ "src": "https://youtu.be/dQw4w9WgXcQ", "width": 640, "height": 480 })),
        ]
    }
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Embed URL (`https://www.youtube.com/embed/{id}`) for a YouTube watch,
/// short, share or embed link. Channel and handle pages have no video.
pub fn youtube_embed_url(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let (host, tail) = rest.split_at(rest.find(['/', '?', '#']).unwrap_or(rest.len()));
    let host = host.to_ascii_lowercase();
    let host = ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(&host);
    if !YOUTUBE_HOSTS.contains(&host) {
        return None;
    }

    let tail = tail.split('#').next().unwrap_or_default();
    let (path, query) = tail.split_once('?').unwrap_or((tail, ""));
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let id = match (host, segments.as_slice()) {
        ("youtu.be", [id, ..]) => Some(*id),
        (_, ["watch"]) => query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v=")),
        (_, ["embed" | "shorts" | "v" | "live", id, ..]) => Some(*id),
        _ => None,
    }?;
    is_video_id(id).then(|| format!("https://www.youtube.com/embed/{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_video_links() {
        let embed = Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string());
        assert_eq!(youtube_embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"), embed);
        assert_eq!(youtube_embed_url("https://youtu.be/dQw4w9WgXcQ?si=abc"), embed);
        assert_eq!(youtube_embed_url("youtube.com/shorts/dQw4w9WgXcQ"), embed);
        assert_eq!(youtube_embed_url("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), embed);
        assert_eq!(youtube_embed_url("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"), embed);
    }

    #[test]
    fn rejects_other_links() {
        assert_eq!(youtube_embed_url("https://vimeo.com/123"), None);
        assert_eq!(youtube_embed_url("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(youtube_embed_url("https://www.youtube.com/@someone"), None);
        assert_eq!(youtube_embed_url("https://notyoutube.com/watch?v=abc"), None);
        assert_eq!(youtube_embed_url(""), None);
    }
}
