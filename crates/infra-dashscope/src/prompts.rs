// Prompt builders for analysis and prompt optimisation

use panelcraft_core::domain::{CharacterReference, ComicStyle, Scene};
use std::fmt::Write;

const SCENE_FIELDS: &str = "\
- sceneNumber: number, starting at 1
- description: what the panel shows, concrete enough to draw from: camera angle \
(close-up, medium shot, wide shot, high or low angle), each character's pose, \
expression, clothing and look, background details, lighting and atmosphere
- characters: names of the characters visible in the panel
- setting: place and time in a few words (\"city rooftop, late night\")
- mood: one or two words guiding colour and lighting (\"tense\", \"warm\")
- dialogue: speech bubble text, omitted when nobody speaks
- action: the key beat of the panel in one sentence";

const PROMPT_ONLY: &str = "Reply with the image prompt only, in English, \
with no explanation or preamble.";

/// Split a story into 4-8 independent scenes (JSON mode)
pub fn scenes_prompt(text: &str) -> String {
    format!(
        "You are a professional comic storyboard artist. Turn the story below into a \
comic storyboard by extracting its key visual moments.

Rules:
1. Every scene is one static, drawable moment.
2. Describe it so an illustrator can draw it directly.
3. Use visual description, not narration.

Scene fields:
{SCENE_FIELDS}

Keep between 4 and 8 scenes, picking the moments with the most visual impact \
and narrative weight.

Return JSON of the form:
{{\"scenes\": [{{\"sceneNumber\": 1, \"description\": \"\", \"characters\": [], \
\"setting\": \"\", \"mood\": \"\", \"dialogue\": \"\", \"action\": \"\"}}]}}

Story:
{text}"
    )
}

/// Split a story into 2-4 pages of 3-6 consecutive scenes (JSON mode)
pub fn pages_prompt(text: &str) -> String {
    format!(
        "You are a professional comic storyboard artist. Turn the story below into \
comic pages, each holding several consecutive panels.

Rules:
1. Split the story into pages of 3 to 6 consecutive scenes, following the pacing.
2. Each page is a complete narrative unit with its own build-up and turn.
3. Scenes on a page follow on from one another.
4. Every scene is one static, drawable moment.

Page fields:
- pageNumber: number, starting at 1
- title: a short title of 3 to 6 words summing up the page
- scenes: the scenes on the page

Scene fields (sceneNumber restarts at 1 on every page):
{SCENE_FIELDS}

Produce 2 to 4 pages.

Return JSON of the form:
{{\"pages\": [{{\"pageNumber\": 1, \"title\": \"\", \"scenes\": [...]}}]}}

Story:
{text}"
    )
}

fn reference_note(references: &[CharacterReference]) -> Option<String> {
    if references.is_empty() {
        return None;
    }
    let names: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
    Some(format!(
        "Reference images are provided for {} character(s): {}. Keep their appearance \
consistent with the references.",
        references.len(),
        names.join(", ")
    ))
}

/// Ask the text model for an image prompt for one panel
pub fn panel_prompt(scene: &Scene, references: &[CharacterReference], style: ComicStyle) -> String {
    let characters = if scene.characters.is_empty() {
        "none".to_string()
    } else {
        scene.characters.join(", ")
    };
    let mut prompt = format!(
        "You are a professional comic art director. Write a detailed image generation \
prompt for one comic panel.

Scene: {}
Characters: {}
Setting: {}
Mood: {}
Comic style: {}
",
        scene.description,
        characters,
        non_empty(&scene.setting, "unspecified"),
        non_empty(&scene.mood, "neutral"),
        style.description(),
    );
    if let Some(dialogue) = scene.dialogue.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(prompt, "Dialogue: {dialogue}");
    }
    if let Some(note) = reference_note(references) {
        let _ = writeln!(prompt, "{note}");
    }
    let _ = write!(
        prompt,
        "
The prompt must cover:
1. The defining traits of the {style} style
2. Composition and camera angle of the scene
3. Each character's look, expression and action
4. Lighting, colour and atmosphere
5. Specific artistic techniques and details

{PROMPT_ONLY}"
    );
    prompt
}

/// Ask the text model for an image prompt for a whole page of panels
pub fn page_prompt(
    page_number: u32,
    title: &str,
    scenes: &[Scene],
    references: &[CharacterReference],
    style: ComicStyle,
) -> String {
    let count = scenes.len();
    let mut prompt = format!(
        "You are a professional comic art director. Write a detailed image generation \
prompt for one complete comic page.

Page: {page_number}
Title: {title}
Panels: {count}
Comic style: {}, with clear panel borders
",
        style.description(),
    );
    if let Some(note) = reference_note(references) {
        let _ = writeln!(prompt, "{note}");
    }

    for (index, scene) in scenes.iter().enumerate() {
        let _ = write!(
            prompt,
            "
Panel {}:
- Action: {}
- Visual: {}
- Characters: {}
- Setting: {}
- Mood: {}
",
            index + 1,
            scene.action,
            scene.description,
            non_empty(&scene.characters.join(", "), "none"),
            scene.setting,
            scene.mood,
        );
        if let Some(dialogue) = scene.dialogue.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(prompt, "- Dialogue: {dialogue}");
        }
    }

    let _ = write!(
        prompt,
        "
Requirements:
- MUST show all {count} panels on a single page, in reading order
- MUST choose a layout that suits {count} panels (a row or column for 3, a 2x2 grid \
for 4, a 2x3 or 3x2 grid for 6)
- MUST include clear panel borders separating each scene
- MUST keep every character consistent across panels
- MUST tell a coherent visual story across the panels
- The page should look like a professionally laid out {style} comic page

{PROMPT_ONLY}"
    );
    prompt
}

/// Ask the text model for a front/side/back character sheet prompt
pub fn character_sheet_prompt(
    name: &str,
    description: &str,
    style: ComicStyle,
    has_reference: bool,
) -> String {
    let mut prompt = format!(
        "You are a professional character designer. Write a detailed image generation \
prompt for a character sheet.

Name: {name}
Description: {description}
Art style: {}

The sheet shows the character three times on one image, labelled \"Front\", \
\"Side\" and \"Back\", with full body proportions, hairstyle, clothing and \
accessories, on a plain white background, in the {style} style.
",
        style.description(),
    );
    if has_reference {
        prompt.push_str(
            "A reference picture of the character is provided: keep hairstyle, clothing \
and accessories consistent with it.\n",
        );
    }
    let _ = write!(prompt, "\n{PROMPT_ONLY}");
    prompt
}

/// Text placed before the optimised prompt when reference images lead the request
pub fn reference_preamble(references: &[CharacterReference]) -> Option<String> {
    if references.is_empty() {
        return None;
    }
    let names: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
    Some(format!(
        "Characters in the reference images, in order: {}.",
        names.join(", ")
    ))
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(description: &str, characters: &[&str], dialogue: Option<&str>) -> Scene {
        Scene {
            id: "scene-1".into(),
            scene_number: 1,
            description: description.into(),
            characters: characters.iter().map(|c| c.to_string()).collect(),
            setting: String::new(),
            mood: "tense".into(),
            dialogue: dialogue.map(str::to_string),
            action: "draws a sword".into(),
        }
    }

    fn reference(name: &str) -> CharacterReference {
        CharacterReference {
            name: name.into(),
            image_url: format!("{name}.png"),
        }
    }

    #[test]
    fn test_analysis_prompts_embed_story() {
        let prompt = scenes_prompt("Once upon a time");
        assert!(prompt.contains("Once upon a time"));
        assert!(prompt.contains("\"scenes\""));

        let prompt = pages_prompt("Once upon a time");
        assert!(prompt.ends_with("Once upon a time"));
        assert!(prompt.contains("\"pages\""));
    }

    #[test]
    fn test_panel_prompt() {
        let s = scene("a duel on the bridge", &["Lin", "Kai"], Some("Stand aside!"));
        let prompt = panel_prompt(&s, &[reference("Lin")], ComicStyle::ChineseManhua);

        assert!(prompt.contains("Scene: a duel on the bridge"));
        assert!(prompt.contains("Characters: Lin, Kai"));
        assert!(prompt.contains("Setting: unspecified"));
        assert!(prompt.contains("Dialogue: Stand aside!"));
        assert!(prompt.contains("1 character(s): Lin"));
        assert!(prompt.contains(ComicStyle::ChineseManhua.description()));

        let bare = panel_prompt(&scene("empty street", &[], None), &[], ComicStyle::default());
        assert!(bare.contains("Characters: none"));
        assert!(!bare.contains("Reference images"));
        assert!(!bare.contains("Dialogue:"));
    }

    #[test]
    fn test_page_prompt_lists_every_panel() {
        let scenes = vec![
            scene("ship docks", &["Mei"], None),
            scene("crowd cheers", &[], Some("Welcome!")),
            scene("storm clouds", &[], None),
        ];
        let prompt = page_prompt(2, "Arrival", &scenes, &[], ComicStyle::EuropeanComics);

        assert!(prompt.contains("Page: 2"));
        assert!(prompt.contains("Title: Arrival"));
        assert!(prompt.contains("Panel 3:"));
        assert!(prompt.contains("- Dialogue: Welcome!"));
        assert!(prompt.contains("MUST show all 3 panels"));
    }

    #[test]
    fn test_sheet_prompt_and_preamble() {
        let prompt = character_sheet_prompt("Mei", "a courier", ComicStyle::KoreanManhwa, true);
        assert!(prompt.contains("Name: Mei"));
        assert!(prompt.contains("\"Front\""));
        assert!(prompt.contains("reference picture"));

        assert_eq!(reference_preamble(&[]), None);
        assert_eq!(
            reference_preamble(&[reference("Mei"), reference("Kai")]).as_deref(),
            Some("Characters in the reference images, in order: Mei, Kai.")
        );
    }
}
