//! End-to-end builds of small PHP projects through the reflector and the
//! standard compiler.

use std::fs;
use std::path::Path;

use docblox_core::builder::{BuildOutcome, ProjectBuilder};
use docblox_core::descriptor::{
    ApiSetDescriptor, ClassDescriptor, DescriptorRef, ElementKind, FileDescriptor,
};
use docblox_core::fqsen::Fqsen;
use docblox_core::observer::CollectingObserver;
use docblox_core::settings::{Settings, VisibilityFilter};
use docblox_php::PhpReflector;
use tempfile::TempDir;

const SENDER: &str = r#"<?php
/**
 * Mail transport.
 * @package Mail
 */
namespace Acme\Mail;

/**
 * Sends messages.
 *
 * @todo retry on failure
 */
class Sender
{
    /**
     * Delivers one message.
     */
    public function deliver($message) {}
}
"#;

const INVOICE: &str = r#"<?php
namespace Acme\Billing;

use Acme\Mail\Sender;

/**
 * An invoice. See {@see Sender} for delivery.
 *
 * @uses Sender::deliver()
 */
class Invoice extends Sender
{
    private $secret;

    protected $lines = [];
}
"#;

fn write_project(root: &Path) {
    fs::create_dir_all(root.join("src/Mail")).unwrap();
    fs::create_dir_all(root.join("src/Billing")).unwrap();
    fs::write(root.join("src/Mail/Sender.php"), SENDER).unwrap();
    fs::write(root.join("src/Billing/Invoice.php"), INVOICE).unwrap();
}

fn build(root: &Path, settings: Settings) -> BuildOutcome {
    let reflector = PhpReflector::new();
    let observer = CollectingObserver::new();
    ProjectBuilder::new(root, settings, &reflector, &observer)
        .build()
        .unwrap()
}

fn api_set(outcome: &BuildOutcome) -> &ApiSetDescriptor {
    outcome.project.api_sets().next().unwrap()
}

fn class<'a>(set: &'a ApiSetDescriptor, fqsen: &str) -> &'a ClassDescriptor {
    let fqsen = Fqsen::new(fqsen);
    set.files()
        .find_map(|(_, file)| file.classes.get(&fqsen))
        .unwrap()
}

fn file<'a>(set: &'a ApiSetDescriptor, path: &str) -> &'a FileDescriptor {
    set.file(set.file_id(path).unwrap()).unwrap()
}

#[test]
fn parent_is_linked_across_files() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    let outcome = build(temp.path(), Settings::default());
    let set = api_set(&outcome);

    let invoice = class(set, "\\Acme\\Billing\\Invoice");
    let parent = invoice.parent.as_ref().unwrap();
    assert_eq!(parent.target, "\\Acme\\Mail\\Sender");
    match parent.resolved.as_ref().unwrap() {
        DescriptorRef::Element(element) => {
            assert_eq!(element.kind, ElementKind::Class);
            assert_eq!(element.fqsen.as_str(), "\\Acme\\Mail\\Sender");
        }
        other => panic!("unexpected reference {:?}", other),
    }
}

#[test]
fn uses_through_alias_gives_used_by() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    let outcome = build(temp.path(), Settings::default());
    let set = api_set(&outcome);

    let deliver = &class(set, "\\Acme\\Mail\\Sender").members.methods["deliver"];
    let used_by = deliver.info.tags.get("used-by");
    assert_eq!(used_by.len(), 1);
    assert_eq!(
        used_by[0].as_reference().unwrap().target,
        "\\Acme\\Billing\\Invoice"
    );
}

#[test]
fn trees_markers_and_links() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    let outcome = build(temp.path(), Settings::default());
    let set = api_set(&outcome);

    for namespace in ["\\Acme", "\\Acme\\Mail", "\\Acme\\Billing"] {
        assert!(set.namespaces.find(&Fqsen::new(namespace)).is_some(), "{}", namespace);
    }
    assert!(set.packages.find(&Fqsen::new("\\Mail")).is_some());
    assert!(set.packages.find(&Fqsen::new("\\Default")).is_some());
    assert!(set.table_of_contents("Namespaces").is_some());
    assert!(set.table_of_contents("Packages").is_some());

    let sender_file = file(set, "src/Mail/Sender.php");
    assert_eq!(sender_file.package.as_deref(), Some("Mail"));
    assert_eq!(sender_file.markers.len(), 1);
    assert_eq!(sender_file.markers[0].kind, "TODO");
    assert_eq!(sender_file.markers[0].message, "retry on failure");

    let invoice = class(set, "\\Acme\\Billing\\Invoice");
    assert_eq!(
        invoice.info.summary,
        "An invoice. See [\\Acme\\Mail\\Sender](/classes/Acme.Mail.Sender.html) for delivery."
    );
}

#[test]
fn source_is_dropped_and_private_members_filtered() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    let settings = Settings {
        visibility: VisibilityFilter::parse(&["public".to_string(), "protected".to_string()])
            .unwrap(),
        ..Settings::default()
    };
    let outcome = build(temp.path(), settings);
    let set = api_set(&outcome);

    assert!(set.files().all(|(_, file)| file.source.is_none()));
    let invoice = class(set, "\\Acme\\Billing\\Invoice");
    assert!(!invoice.members.properties.contains_key("secret"));
    assert!(invoice.members.properties.contains_key("lines"));
    assert!(set.lookup("\\Acme\\Billing\\Invoice::$secret").is_none());
}

#[test]
fn second_build_reuses_cached_files() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let first = build(temp.path(), Settings::default());
    assert_eq!(first.report.parsed, 2);
    assert_eq!(first.report.skipped, 0);

    let second = build(temp.path(), Settings::default());
    assert_eq!(second.report.parsed, 0);
    assert_eq!(second.report.skipped, 2);
    let invoice = class(api_set(&second), "\\Acme\\Billing\\Invoice");
    assert!(invoice.parent.as_ref().unwrap().is_resolved());

    fs::write(
        temp.path().join("src/Billing/Invoice.php"),
        INVOICE.replace("class Invoice", "final class Invoice"),
    )
    .unwrap();
    let third = build(temp.path(), Settings::default());
    assert_eq!(third.report.parsed, 1);
    assert_eq!(third.report.skipped, 1);
    assert!(class(api_set(&third), "\\Acme\\Billing\\Invoice").is_final);
}
