//
// main.rs
//
// Command-driven demo of the filter and autocomplete core
//

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use tagsift::autocomplete::AutocompleteSession;
use tagsift::catalog::{Album, InMemoryCatalog};
use tagsift::config::{parse_autocomplete_config, AutocompleteConfig};
use tagsift::dom::{Document, NodeId, NodeTree};
use tagsift::filter::{Category, CategoryFilter, FilteredListing, SelectedItems};
use tagsift::{CategoryId, SuggestionItem};

fn print_usage() {
    println!(
        "tagsift {}, a category filter and autocomplete playground.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: tagsift [OPTIONS]

Available options:

--script <path>              Read commands from a file instead of stdin
--catalog <path>             Load categories and albums from a JSON file
--settings <path>            Load an `autocomplete` settings section from a JSON file
--latency <ms>               Simulated remote latency (default 150)
--version                    Print the version
--help                       Print this help message

Commands (one per line):

type [text]                  Replace the search text
wait <ms>                    Let time pass
pick <n>                     Click the n-th suggestion
create                       Click the "create new" affordance
enter                        Press Enter in the input
click-outside | click-inside Click somewhere on the page
toggle <id>                  Toggle a category filter
show | filters | albums | selected
"#
    );
}

fn default_catalog() -> InMemoryCatalog {
    let categories = ["Cats", "Dogs", "Landscapes", "Portraits", "Street"]
        .iter()
        .zip(1..)
        .map(|(name, id)| Category {
            id,
            category: name.to_string(),
        })
        .collect();
    let albums = vec![
        Album {
            id: 100,
            title: "Shelter visit".into(),
            categories: vec![1, 2],
        },
        Album {
            id: 101,
            title: "Alps".into(),
            categories: vec![3],
        },
        Album {
            id: 102,
            title: "Old town".into(),
            categories: vec![4, 5],
        },
    ];
    InMemoryCatalog::new(categories, albums)
}

struct Options {
    script: Option<PathBuf>,
    catalog: Option<PathBuf>,
    settings: Option<PathBuf>,
    latency_ms: u64,
}

/// Page layout: the autocomplete container with its input, and a sidebar
struct Page {
    document: Arc<Document>,
    container: NodeId,
    input: NodeId,
    sidebar: NodeId,
}

impl Page {
    fn new() -> Self {
        let mut tree = NodeTree::new();
        let container = tree.append_child(tree.root());
        let input = tree.append_child(container);
        let sidebar = tree.append_child(tree.root());
        Self {
            document: Arc::new(Document::new(tree)),
            container,
            input,
            sidebar,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn run<R: AsyncBufRead + Unpin>(options: Options, input: R) -> anyhow::Result<()> {
    let config = match &options.settings {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading settings {}", path.display()))?;
            let settings: serde_json::Value = serde_json::from_str(&text)?;
            parse_autocomplete_config(&settings).unwrap_or_default()
        }
        None => AutocompleteConfig::default(),
    };

    let catalog = match &options.catalog {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading catalog {}", path.display()))?;
            InMemoryCatalog::from_json(&text)?
        }
        None => default_catalog(),
    };
    let catalog = Arc::new(catalog.with_latency(Duration::from_millis(options.latency_ms)));

    let page = Page::new();
    let mut filter = CategoryFilter::new();
    filter.load(&*catalog).await;
    let albums: FilteredListing<Album> =
        FilteredListing::follow(filter.subscribe(), catalog.clone());

    let (selected_tx, mut selected_rx) = mpsc::unbounded_channel();
    let mut selected = SelectedItems::<CategoryId>::new();
    let session =
        AutocompleteSession::builder(catalog.clone(), page.document.clone(), page.container)
            .config(config)
            .on_selected(move |item: SuggestionItem<CategoryId>| {
                let _ = selected_tx.send(item);
            })
            .on_enter(|text| log::info!("Enter pressed with {:?}", text))
            .mount();

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "type" => session.input(arg),
            "wait" => {
                let ms: u64 = arg.parse().with_context(|| format!("bad wait: {arg:?}"))?;
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            "pick" => {
                let index: usize = arg.parse().with_context(|| format!("bad pick: {arg:?}"))?;
                session.select(index);
            }
            "create" => session.create_new(),
            "enter" => session.press_enter(),
            "click-outside" => page.document.dispatch_click(page.sidebar),
            "click-inside" => page.document.dispatch_click(page.input),
            "toggle" => {
                let id: CategoryId = arg.parse().with_context(|| format!("bad id: {arg:?}"))?;
                print_json(&filter.toggle(id))?;
            }
            "show" => {
                session.flush().await;
                print_json(&session.view())?;
            }
            "filters" => print_json(&filter.entries())?,
            "albums" => print_json(&albums.view())?,
            "selected" => {
                let items: Vec<_> = selected.iter().cloned().collect();
                print_json(&items)?;
            }
            other => anyhow::bail!("Unknown command: '{other}'"),
        }

        session.flush().await;
        while let Ok(item) = selected_rx.try_recv() {
            if !selected.add(item.clone()) {
                log::info!("{:?} already selected", item.text);
            }
        }
    }

    session.unmount().await;
    albums.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut options = Options {
        script: None,
        catalog: None,
        settings: None,
        latency_ms: 150,
    };

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--script" | "--catalog" | "--settings" | "--latency" => {
                let value = argv
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing value for '{arg}'"))?;
                match arg.as_str() {
                    "--script" => options.script = Some(PathBuf::from(value)),
                    "--catalog" => options.catalog = Some(PathBuf::from(value)),
                    "--settings" => options.settings = Some(PathBuf::from(value)),
                    _ => {
                        options.latency_ms = value
                            .parse()
                            .with_context(|| format!("bad latency: {value:?}"))?
                    }
                }
            }
            "--version" => {
                println!("tagsift {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    env_logger::init();

    match options.script.clone() {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening script {}", path.display()))?;
            run(options, BufReader::new(file)).await
        }
        None => run(options, BufReader::new(tokio::io::stdin())).await,
    }
}
