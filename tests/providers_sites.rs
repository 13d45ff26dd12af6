// tests/providers_sites.rs
use listing_watch::ingest::extract::PageContext;
use listing_watch::ingest::providers::extractor_for;
use listing_watch::{Listing, Source};
use scraper::Html;

const EMLAKJET_HTML: &str = include_str!("fixtures/emlakjet.html");
const HEPSIEMLAK_HTML: &str = include_str!("fixtures/hepsiemlak.html");
const SAHIBINDEN_HTML: &str = include_str!("fixtures/sahibinden.html");

fn extract(source: Source, html: &str) -> Vec<Listing> {
    let ctx = PageContext {
        page_url: "https://search.test/kadikoy".to_string(),
        location: Some("istanbul-kadikoy".to_string()),
    };
    extractor_for(source).extract(&Html::parse_document(html), &ctx)
}

#[test]
fn emlakjet_fixture_yields_cards_in_dom_order() {
    let items = extract(Source::Emlakjet, EMLAKJET_HTML);
    // the card without a price is skipped
    assert_eq!(items.len(), 3);

    assert_eq!(items[0].id, "emlakjet-1001");
    assert_eq!(items[0].title, "Kadıköy Moda'da 2+1 Kiralık Daire");
    assert_eq!(items[0].price, "25.000 TL");
    assert_eq!(
        items[0].link,
        "https://www.emlakjet.com/ilan/kadikoy-2-1-kiralik-daire-1001"
    );
    assert_eq!(items[0].location.as_deref(), Some("istanbul-kadikoy"));

    assert_eq!(items[1].id, "emlakjet-1002");
    assert_eq!(items[1].link, "https://www.emlakjet.com/ilan/fenerbahce-3-1-1002");

    // no data-id: content hash
    assert!(items[2].id.starts_with("emlakjet-h"));
    assert_eq!(items[2].title, "Göztepe 1+1");
    assert!(items.iter().all(|l| l.source == Source::Emlakjet));
}

#[test]
fn emlakjet_hash_id_is_stable_across_fetches() {
    let a = extract(Source::Emlakjet, EMLAKJET_HTML);
    let b = extract(Source::Emlakjet, EMLAKJET_HTML);
    assert_eq!(a, b);
}

#[test]
fn hepsiemlak_joins_amount_and_currency() {
    let items = extract(Source::Hepsiemlak, HEPSIEMLAK_HTML);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "hepsiemlak-77");
    assert_eq!(items[0].price, "55.000 TL");
    assert_eq!(items[1].price, "32.500 TL");
    assert_eq!(
        items[0].link,
        "https://www.hepsiemlak.com/kadikoy-kiralik/daire/77"
    );
}

#[test]
fn sahibinden_skips_ads_and_recovers_id_from_link() {
    let items = extract(Source::Sahibinden, SAHIBINDEN_HTML);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "sahibinden-1188001122");
    assert_eq!(items[0].price, "30.000 TL");
    assert_eq!(items[1].id, "sahibinden-1188009999");
    assert_eq!(items[1].title, "Yeldeğirmeni 2+1");
    assert!(items[1]
        .link
        .starts_with("https://www.sahibinden.com/ilan/"));
}

#[test]
fn fallback_container_selector_is_used_when_primary_is_gone() {
    let html = r#"<html><body>
        <article data-id="9"><a href="/ilan/9"><h3>Redesigned card</h3></a><span class="price-tag">9 TL</span></article>
    </body></html>"#;
    let items = extract(Source::Emlakjet, html);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "emlakjet-9");
    assert_eq!(items[0].price, "9 TL");
}

#[test]
fn card_without_detail_link_is_skipped() {
    let html = r#"<html><body>
        <div class="styles_listingItem__z" data-id="5"><h3>No anchor</h3><div class="styles_price__z">5 TL</div></div>
        <div class="styles_listingItem__z"><h3>Also no anchor</h3><div class="styles_price__z">6 TL</div></div>
        <div class="styles_listingItem__z" data-id="7"><a href="/ilan/7"><h3>Linked</h3></a><div class="styles_price__z">7 TL</div></div>
    </body></html>"#;
    let items = extract(Source::Emlakjet, html);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "emlakjet-7");
    assert_eq!(items[0].link, "https://www.emlakjet.com/ilan/7");
    assert!(items.iter().all(|l| l.link != "https://search.test/kadikoy"));
}

#[test]
fn unrelated_page_yields_nothing() {
    let items = extract(Source::Sahibinden, "<html><body><p>captcha</p></body></html>");
    assert!(items.is_empty());
}
