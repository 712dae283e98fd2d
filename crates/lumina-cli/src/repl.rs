//! The interactive terminal session: a thin shell that forwards learner
//! intents to the controller and renders snapshots as they change.

use std::io::{self, Write as _};
use std::path::Path;

use eyre::Result;

use lumina_chat::{ChatError, ConversationController, TurnOutcome};
use lumina_core::models::message::{Attachment, Sender};
use lumina_core::models::profile::UserProfile;
use lumina_core::models::subject::Subject;

const HELP: &str = "\
commands:
  /subject <name>   switch subject (general, math, science, history, literature)
  /image <prompt>   generate an illustrative image
  /attach <path>    attach an image to your next message
  /graph            show the current concept graph
  /progress         show the learning dashboard
  /profile <name>   update your display name
  /key <api-key>    set the Gemini API key
  /logout           end the session
  /quit             exit
anything else is sent to your tutor.";

pub async fn run(mut controller: ConversationController) -> Result<()> {
    println!("Lumina — your AI learning companion");

    ensure_login(&mut controller)?;
    println!("{HELP}\n");
    print_greeting(&controller);

    let mut pending_attachment: Option<Attachment> = None;

    loop {
        controller.pump_side_effects();

        let prompt = format!(
            "[{}]{}> ",
            controller.active_subject().as_str(),
            if pending_attachment.is_some() { "+img" } else { "" }
        );
        let Some(line) = read_line(&prompt)? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (command, arg) = rest.split_once(' ').unwrap_or((rest, ""));
            match command {
                "quit" | "exit" => break,
                "help" => println!("{HELP}"),
                "subject" => match Subject::parse(arg) {
                    Ok(subject) => {
                        controller.switch_subject(subject);
                        println!("now studying {}", subject.display_name());
                    }
                    Err(e) => println!("{e}"),
                },
                "image" => {
                    controller = image_turn(controller, arg).await?;
                }
                "attach" => match load_attachment(arg) {
                    Ok(attachment) => {
                        println!("image staged for your next message");
                        pending_attachment = Some(attachment);
                    }
                    Err(e) => println!("could not attach: {e}"),
                },
                "graph" => print_graph(&controller),
                "progress" => print_progress(&controller),
                "profile" => {
                    if arg.trim().is_empty() {
                        println!("usage: /profile <name>");
                    } else if let Err(e) = controller.save_profile(UserProfile::new(arg.trim())) {
                        println!("could not save profile: {e}");
                    } else {
                        println!("profile saved");
                    }
                }
                "key" => {
                    if let Err(e) = controller.set_user_credential(arg.trim()) {
                        println!("could not save key: {e}");
                    } else {
                        println!("key saved");
                    }
                }
                "logout" => {
                    controller.logout()?;
                    pending_attachment = None;
                    println!("logged out");
                    ensure_login(&mut controller)?;
                    print_greeting(&controller);
                }
                other => println!("unknown command: /{other}"),
            }
            continue;
        }

        let attachment = pending_attachment.take();
        controller = chat_turn(controller, line.to_string(), attachment).await?;
    }

    Ok(())
}

/// Run one chat turn, rendering streamed fragments as the snapshot grows.
/// The turn itself runs on a spawned task so this loop can watch progress.
async fn chat_turn(
    controller: ConversationController,
    text: String,
    attachment: Option<Attachment>,
) -> Result<ConversationController> {
    let mut snapshots = controller.subscribe();
    let mut handle = tokio::spawn(async move {
        let mut controller = controller;
        let result = controller.send_text(&text, attachment).await;
        (controller, result)
    });

    print!("lumina: ");
    io::stdout().flush()?;

    let mut printed = 0usize;
    let (controller, result) = loop {
        tokio::select! {
            joined = &mut handle => break joined?,
            changed = snapshots.changed() => {
                if changed.is_ok() {
                    let streaming_text = snapshots
                        .borrow_and_update()
                        .messages
                        .iter()
                        .rev()
                        .find(|m| m.is_streaming)
                        .map(|m| m.text.clone());
                    if let Some(text) = streaming_text {
                        print!("{}", &text[printed..]);
                        io::stdout().flush()?;
                        printed = text.len();
                    }
                }
            }
        }
    };

    match &result {
        Ok(TurnOutcome::Rejected) => println!("(nothing to send)"),
        Ok(_) => {
            // Print whatever arrived after the last snapshot we rendered.
            if let Some(reply) = controller
                .timeline()
                .iter()
                .rev()
                .find(|m| m.sender == Sender::Bot)
            {
                match reply.text.get(printed..) {
                    Some(tail) => println!("{tail}"),
                    // The reply text was replaced wholesale (apology path).
                    None => println!("\n{}", reply.text),
                }
                if !reply.grounding_urls.is_empty() {
                    println!("sources:");
                    for url in &reply.grounding_urls {
                        println!("  {url}");
                    }
                }
            } else {
                println!();
            }
        }
        Err(_) => println!(),
    }

    report_error(result);
    Ok(controller)
}

async fn image_turn(
    mut controller: ConversationController,
    prompt: &str,
) -> Result<ConversationController> {
    println!("dreaming up your image...");
    let result = controller.generate_image(prompt).await;

    match &result {
        Ok(TurnOutcome::ImageDelivered) => {
            if let Some(reply) = controller.timeline().last() {
                if let Some(image) = reply.attachments.first() {
                    let path = std::env::temp_dir().join(format!("lumina-{}.jpg", reply.id));
                    std::fs::write(&path, &image.data)?;
                    println!("image saved to {}", path.display());
                }
            }
        }
        Ok(TurnOutcome::Rejected) => println!("describe the image you want to generate"),
        Ok(TurnOutcome::Errored) => {
            if let Some(reply) = controller.timeline().last() {
                println!("lumina: {}", reply.text);
            }
        }
        _ => {}
    }

    report_error(result);
    Ok(controller)
}

/// Surface a turn error: a missing credential re-prompts for a key, a
/// persistence failure is a blocking notice.
fn report_error(result: Result<TurnOutcome, ChatError>) {
    match result {
        Err(ChatError::CredentialMissing) => {
            println!("an API key is required to continue — set one with /key <api-key>");
        }
        Err(e @ ChatError::Persistence(_)) => {
            println!("! {e}");
            println!("! your data could not be saved; fix the storage problem and retry");
        }
        Ok(_) => {}
    }
}

fn ensure_login(controller: &mut ConversationController) -> Result<()> {
    if controller.current_profile().is_none() {
        loop {
            let Some(name) = read_line("your name: ")? else {
                return Ok(());
            };
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            controller.save_profile(UserProfile::new(name))?;
            break;
        }
    }
    if let Some(profile) = controller.current_profile() {
        println!("welcome, {}!", profile.name);
    }

    while !controller.has_access() {
        let Some(key) = read_line("Gemini API key: ")? else {
            return Ok(());
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        controller.set_user_credential(key)?;
    }
    Ok(())
}

fn print_greeting(controller: &ConversationController) {
    if let Some(greeting) = controller.timeline().first() {
        println!("lumina: {}\n", greeting.text);
    }
}

fn print_graph(controller: &ConversationController) {
    match controller.concept_graph() {
        None => println!("no concept graph yet — longer Science or History answers produce one"),
        Some(graph) => {
            println!("concept graph ({} nodes):", graph.nodes.len());
            for node in &graph.nodes {
                println!("  [{}] {} (size {})", node.group, node.id, node.val);
            }
            for link in &graph.links {
                println!("  {} -> {} (weight {})", link.source, link.target, link.value);
            }
        }
    }
}

fn print_progress(controller: &ConversationController) {
    let report = controller.progress();
    println!(
        "level {} — {} total sessions",
        report.level, report.total_sessions
    );
    for entry in &report.per_subject {
        println!(
            "  {:<28} {:>3} sessions  score {:>3}",
            entry.subject.display_name(),
            entry.sessions,
            entry.score
        );
    }
}

fn load_attachment(path: &str) -> Result<Attachment> {
    let path = path.trim();
    let data = std::fs::read(path)?;
    let mime = mime_for_path(Path::new(path))
        .ok_or_else(|| eyre::eyre!("unsupported image type (use jpg, png, webp, or gif)"))?;
    Ok(Attachment::image(data, mime))
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase()
        .as_str()
    {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Prompt and read one line from stdin. `None` on end of input.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
