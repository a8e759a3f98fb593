use std::time::Duration;

use agora_config::TimingsConfig;
use agora_protocols::Page;

use super::*;
use crate::testing::{FakeElement, FakePage};

const PROBE: &str = "Should cities ban cars downtown?";

fn timings(attempts: u32) -> TimingsConfig {
    TimingsConfig {
        discovery_attempts: attempts,
        ..Default::default()
    }
}

/// body > main(scroll) > section > [user > p(PROBE)]
fn conversation(page: &FakePage) -> (usize, usize) {
    let main = page.add_element(page.body_id(), FakeElement::new("main").with_overflow("auto"));
    let section = page.add_element(main, FakeElement::new("section"));
    let user = page.add_element(section, FakeElement::div());
    page.add_block(user, PROBE);
    (main, section)
}

async fn tag_of(page: &FakePage, node: &DomNodeRef) -> String {
    page.describe(node).await.unwrap().tag
}

#[tokio::test(start_paused = true)]
async fn test_probe_discovery_finds_parent_of_echo_branch() {
    let page = FakePage::new();
    let (_, section) = conversation(&page);

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        site.add_block(section, "Banning cars has tradeoffs.");
    });

    let timings = timings(40);
    let region = Discovery::new(&page, PROBE, &timings).by_probe().await.unwrap();
    writer.await.unwrap();

    assert_eq!(tag_of(&page, region.container()).await, "section");
    assert_eq!(region.scope(), Scope::ExcludeBranch(0));
    assert_eq!(region.extract(&page).await.unwrap(), "Banning cars has tradeoffs.");

    region.release(&page).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_probe_discovery_detects_growing_placeholder() {
    let page = FakePage::new();
    let (_, section) = conversation(&page);
    let reply = page.add_block(section, "");

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        site.set_text(reply, "A considerably longer answer");
    });

    let timings = timings(40);
    let region = Discovery::new(&page, PROBE, &timings).by_probe().await.unwrap();
    writer.await.unwrap();

    assert_eq!(tag_of(&page, region.container()).await, "section");
    assert_eq!(region.extract(&page).await.unwrap(), "A considerably longer answer");
    region.release(&page).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_small_growth_does_not_signal() {
    let page = FakePage::new();
    let (_, section) = conversation(&page);
    let other = page.add_block(section, "abc");

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        site.set_text(other, "abcdef");
    });

    let timings = timings(5);
    assert!(Discovery::new(&page, PROBE, &timings).by_probe().await.is_none());
    writer.await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_probe_never_rendered_times_out() {
    let page = FakePage::new();
    let main = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(main, "nothing relevant");

    let timings = timings(5);
    let start = tokio::time::Instant::now();
    assert!(Discovery::new(&page, PROBE, &timings).by_probe().await.is_none());
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_editable_input_is_not_an_anchor() {
    let page = FakePage::new();
    let input = page.add_element(page.body_id(), FakeElement::textarea());
    let handle = page.handle(input);
    page.focus(&handle).await.unwrap();
    page.insert_text(PROBE).await.unwrap();
    page.release(handle).await.unwrap();

    let timings = timings(3);
    assert!(Discovery::new(&page, PROBE, &timings).by_probe().await.is_none());
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_discovery_fails_without_new_children() {
    let page = FakePage::new();
    let list = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(list, "earlier question");
    page.add_block(list, "earlier answer");
    let root = page.handle(list);
    page.mark_children_seen(&root).await.unwrap();

    let timings = timings(4);
    let discovery = Discovery::new(&page, PROBE, &timings);
    assert!(discovery.by_marker(&root, Some(&root)).await.is_none());

    page.release(root).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_discovery_picks_new_wrapper() {
    let page = FakePage::new();
    let list = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(list, "earlier answer");
    let root = page.handle(list);
    page.mark_children_seen(&root).await.unwrap();
    page.add_block(list, PROBE);

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        site.add_block(list, "Only if transit improves.");
    });

    let timings = timings(10);
    let region = Discovery::new(&page, PROBE, &timings)
        .by_marker(&root, None)
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(region.scope(), Scope::Whole);
    assert_eq!(region.extract(&page).await.unwrap(), "Only if transit improves.");
    region.release(&page).await.unwrap();
    page.release(root).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_discovery_resolves_echo_wrapper() {
    let page = FakePage::new();
    let list = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(list, "earlier turn");
    let root = page.handle(list);
    page.mark_children_seen(&root).await.unwrap();

    // One turn wrapper holds both the echoed question and the reply.
    let turn = page.add_element(list, FakeElement::new("article"));
    page.add_block(turn, "You");
    page.add_block(turn, PROBE);

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(900)).await;
        site.add_block(turn, "It depends on the city.");
    });

    let timings = timings(10);
    let region = Discovery::new(&page, PROBE, &timings)
        .by_marker(&root, None)
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(tag_of(&page, region.container()).await, "article");
    assert_eq!(region.scope(), Scope::UnseenChildren);
    region.release(&page).await.unwrap();
    page.release(root).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_discovery_falls_back_to_previous_container() {
    let page = FakePage::new();
    let main = page.add_element(page.body_id(), FakeElement::scroll_list());
    let list = page.add_element(main, FakeElement::new("ol"));
    page.add_block(list, "earlier answer");
    let root = page.handle(main);
    let previous = page.handle(list);
    page.mark_children_seen(&root).await.unwrap();
    page.mark_children_seen(&previous).await.unwrap();

    page.add_block(list, PROBE);
    page.add_block(list, "A flat-list reply");

    let timings = timings(3);
    let region = Discovery::new(&page, PROBE, &timings)
        .by_marker(&root, Some(&previous))
        .await
        .unwrap();

    assert_eq!(tag_of(&page, region.container()).await, "ol");
    assert_eq!(region.scope(), Scope::UnseenChildren);
    assert_eq!(region.extract(&page).await.unwrap(), "A flat-list reply");
    region.release(&page).await.unwrap();
    page.release(root).await.unwrap();
    page.release(previous).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test]
async fn test_scroll_ancestor_resolution() {
    let page = FakePage::new();
    let main = page.add_element(page.body_id(), FakeElement::scroll_list().with_rect(800.0, 600.0));
    let section = page.add_element(main, FakeElement::new("section"));
    let loose = page.add_element(page.body_id(), FakeElement::new("aside"));

    let inner = page.handle(section);
    let found = scroll_ancestor(&page, &inner).await.unwrap();
    assert!(page.describe(&found).await.unwrap().is_scroll_container());
    page.release(found).await.unwrap();

    let itself = page.handle(main);
    let found = scroll_ancestor(&page, &itself).await.unwrap();
    assert!(page.describe(&found).await.unwrap().is_scroll_container());
    page.release(found).await.unwrap();

    let outside = page.handle(loose);
    let found = scroll_ancestor(&page, &outside).await.unwrap();
    assert!(page.describe(&found).await.unwrap().is_body());
    page.release(found).await.unwrap();

    for handle in [inner, itself, outside] {
        page.release(handle).await.unwrap();
    }
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_discovery_skips_collapsed_child() {
    let page = FakePage::new();
    let list = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(list, "earlier answer");
    let root = page.handle(list);
    page.mark_children_seen(&root).await.unwrap();
    page.add_block(list, PROBE);
    let spacer = page.add_block(list, "typing");
    page.set_rect(spacer, 0.0, 0.0);

    let site = page.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        site.add_block(list, "Parking minimums matter more.");
    });

    let timings = timings(10);
    let region = Discovery::new(&page, PROBE, &timings)
        .by_marker(&root, None)
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(region.extract(&page).await.unwrap(), "Parking minimums matter more.");
    region.release(&page).await.unwrap();
    page.release(root).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_echo_relocation_reads_past_latest_echo() {
    let page = FakePage::new();
    let main = page.add_element(page.body_id(), FakeElement::new("main").with_overflow("auto"));
    page.add_block(main, "older reply");
    let turn = page.add_element(main, FakeElement::div());
    page.add_block(turn, PROBE);
    page.add_block(turn, "Rebuilt reply");

    let timings = timings(4);
    let region = Discovery::new(&page, PROBE, &timings).after_echo().await.unwrap();

    assert_eq!(tag_of(&page, region.container()).await, "main");
    assert_eq!(region.scope(), Scope::AfterEcho(1));
    assert_eq!(region.extract(&page).await.unwrap(), "Rebuilt reply");
    region.release(&page).await.unwrap();
    assert_eq!(page.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_echo_relocation_without_echo_gives_up() {
    let page = FakePage::new();
    let list = page.add_element(page.body_id(), FakeElement::scroll_list());
    page.add_block(list, "unrelated");

    let timings = timings(3);
    assert!(Discovery::new(&page, PROBE, &timings).after_echo().await.is_none());
    assert_eq!(page.live_handles(), 0);
}
