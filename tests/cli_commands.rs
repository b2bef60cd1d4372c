//! Command-level tests: run the CLI entry points over a temporary project and
//! inspect the JSON they return.

use std::fs;
use std::path::Path;

use docblox::cli::{cache_clear, cache_status, run_build, run_parse};
use docblox::settings::{CliOverrides, CONFIG_FILE_NAME};
use serde_json::Value;
use tempfile::TempDir;

const CART: &str = r#"<?php
/**
 * Shopping cart.
 * @package Shop
 */
namespace Shop;

/**
 * Holds line items.
 *
 * @uses Totals
 */
class Cart
{
    /** @var array */
    protected $items = [];

    /**
     * Adds an item.
     *
     * @param string $sku Stock keeping unit
     * @param int    $qty
     */
    public function add($sku, $qty = 1) {}

    private function recount() {}
}
"#;

const TOTALS: &str = r#"<?php
namespace Shop;

/**
 * Computes totals. FIXME handle discounts
 */
interface Totals
{
    public function total();
}

function money_format_eu($amount) {}
"#;

fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/Cart.php"), CART).unwrap();
    fs::write(temp.path().join("src/Totals.php"), TOTALS).unwrap();
    temp
}

fn json(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

fn api_set(response: &Value) -> &Value {
    &response["project"]["versions"][0]["sets"][0]
}

#[test]
fn parse_then_cache_status() {
    let project = create_project();
    let overrides = CliOverrides::default();

    let parsed = json(&run_parse(project.path(), &overrides, true).unwrap());
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["report"]["discovered"], 2);
    assert_eq!(parsed["report"]["parsed"], 2);
    assert_eq!(parsed["report"]["cache"]["written"], 2);
    assert_eq!(parsed["problems"].as_array().unwrap().len(), 0);

    let status = json(&cache_status(project.path(), &overrides).unwrap());
    assert_eq!(status["exists"], true);
    assert_eq!(status["files"], 2);

    let again = json(&run_parse(project.path(), &overrides, true).unwrap());
    assert_eq!(again["report"]["parsed"], 0);
    assert_eq!(again["report"]["skipped"], 2);
}

#[test]
fn run_embeds_the_structure() {
    let project = create_project();
    let response = json(&run_build(project.path(), &CliOverrides::default(), false, None).unwrap());

    assert_eq!(response["status"], "ok");
    assert_eq!(response["report"]["parsed"], 2);
    assert!(response["output"].is_null());
    let set = api_set(&response);
    assert_eq!(set["type"], "api");
    assert_eq!(set["name"], "api");

    let files = set["files"].as_array().unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f["path"].as_str().unwrap()).collect();
    assert_eq!(paths, ["src/Cart.php", "src/Totals.php"]);

    let elements = set["indexes"]["elements"].as_object().unwrap();
    for key in [
        "\\Shop\\Cart",
        "\\Shop\\Cart::add()",
        "\\Shop\\Cart::$items",
        "\\Shop\\Totals",
        "\\Shop\\money_format_eu()",
        "\\Shop\\Cart::recount()",
    ] {
        assert!(elements.contains_key(key), "{}", key);
    }

    let tocs: Vec<&str> = set["tables_of_contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|toc| toc["name"].as_str().unwrap())
        .collect();
    assert!(tocs.contains(&"Namespaces"));
    assert!(tocs.contains(&"Packages"));

    let totals = &files[1];
    assert_eq!(totals["markers"][0]["type"], "FIXME");
    assert!(totals.get("source").is_none());
}

#[test]
fn run_writes_structure_to_output() {
    let project = create_project();
    let output = project.path().join("build/structure.json");

    let response = json(
        &run_build(
            project.path(),
            &CliOverrides::default(),
            false,
            Some(output.as_path()),
        )
        .unwrap(),
    );
    assert!(response.get("project").is_none());
    assert_eq!(response["output"], output.display().to_string());

    let written = json(&fs::read_to_string(&output).unwrap());
    assert_eq!(written["title"], response["title"]);
    assert_eq!(written["versions"][0]["number"], "latest");
}

#[test]
fn config_file_sets_title_and_visibility() {
    let project = create_project();
    fs::write(
        project.path().join(CONFIG_FILE_NAME),
        r#"{ "title": "Shop API", "visibility": ["public", "private"] }"#,
    )
    .unwrap();

    let response = json(&run_build(project.path(), &CliOverrides::default(), false, None).unwrap());
    assert_eq!(response["title"], "Shop API");
    let elements = api_set(&response)["indexes"]["elements"].as_object().unwrap();
    assert!(elements.contains_key("\\Shop\\Cart::recount()"));
    assert!(!elements.contains_key("\\Shop\\Cart::$items"));
}

#[test]
fn strict_mode_rejects_duplicate_names() {
    let project = create_project();
    fs::write(
        project.path().join("src/Copy.php"),
        "<?php\nnamespace Shop;\nclass Cart {}\n",
    )
    .unwrap();
    let overrides = CliOverrides {
        strict_fqsen: true,
        ..CliOverrides::default()
    };

    let err = run_build(project.path(), &overrides, false, None).unwrap_err();
    assert_eq!(err.code_name(), "DuplicateFqsen");
}

#[test]
fn cache_clear_removes_the_directory() {
    let project = create_project();
    let overrides = CliOverrides::default();
    run_parse(project.path(), &overrides, true).unwrap();
    assert!(cache_dir(project.path()).exists());

    let cleared = json(&cache_clear(project.path(), &overrides).unwrap());
    assert_eq!(cleared["removed"], 2);
    assert!(!cache_dir(project.path()).exists());

    let status = json(&cache_status(project.path(), &overrides).unwrap());
    assert_eq!(status["exists"], false);
    assert_eq!(status["files"], 0);
}

fn cache_dir(root: &Path) -> std::path::PathBuf {
    root.join(".docblox")
}
