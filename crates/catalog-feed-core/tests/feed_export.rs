use catalog_feed_core::{
    decode_channel, decode_entity, encode, AttributeSetNames, ExportConfig, ExportError,
    FeedExporter, MemoryRowSource, RawRow, XmlSink,
};

const CONFIG: &str = r#"
date_field = "min"
date_attributes = ["news_from_date"]

[[channels]]
id = 1
name = "Main"
website_id = 1

[[channels]]
id = 2
name = "Outlet"
website_id = 2
grouped_export = true
show_out_of_stock = true

[[channels]]
id = 3
name = "Staging"
website_id = 3
enabled = false
"#;

fn products() -> MemoryRowSource {
    MemoryRowSource::new().with_rows(
        0,
        [
            RawRow::new()
                .with("entity_id", 10i64)
                .with("type_id", "simple")
                .with("status", 1i64)
                .with("visibility", 4i64)
                .with("name", "Desk Lamp")
                .with("price", "19.5")
                .with("website_id", 1i64)
                .with("stock_qty", 3i64)
                .with("is_in_stock", 1i64)
                .with("attribute_set_id", 4i64)
                .with("category_id", 5i64)
                .with("news_from_date", "2024-03-01"),
            RawRow::new()
                .with("entity_id", 10i64)
                .with("news_from_date", "2023-12-24 08:00:00"),
            RawRow::new()
                .with("entity_id", 11i64)
                .with("type_id", "simple")
                .with("status", 1i64)
                .with("visibility", 1i64)
                .with("name", "Desk Lamp Red")
                .with("price", "21")
                .with("parent_id", 12i64)
                .with("group_code", 12i64)
                .with("website_id", 2i64)
                .with("stock_qty", 0i64)
                .with("is_in_stock", 0i64),
        ],
    )
}

fn categories() -> MemoryRowSource {
    let node = |id: i64, parent: i64, name: &str, active: bool| {
        RawRow::new()
            .with("entity_id", id)
            .with("parent_id", parent)
            .with("name", name)
            .with("position", id)
            .with("is_active", i64::from(active))
    };

    MemoryRowSource::new().with_rows(
        0,
        [
            node(2, 1, "Default", false),
            node(6, 9, "Lost", true),
            node(5, 2, "Lighting", true),
            node(7, 2, "Archive", false),
        ],
    )
}

fn item_id(channel_id: u32, entity_id: u64) -> String {
    encode(channel_id, entity_id).expect("encode")
}

fn export(config: &ExportConfig) -> (String, catalog_feed_core::FeedSummary) {
    let attribute_sets = AttributeSetNames::from_pairs([(4, "Furniture".to_string())]);
    let mut sink = XmlSink::new(Vec::new());
    let summary = FeedExporter::new(config, &attribute_sets)
        .export(&mut sink, &mut products(), &mut categories())
        .expect("export feed");
    (
        String::from_utf8(sink.into_inner()).expect("utf8 feed"),
        summary,
    )
}

#[test]
fn multi_channel_feed_applies_channel_rules() {
    let config = ExportConfig::from_toml_str(CONFIG).expect("config");
    let (xml, summary) = export(&config);

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><feed><items>"));
    assert!(xml.ends_with("</categories></feed>"));

    // Channel 1: only the visible lamp linked to website 1.
    assert!(xml.contains("<item><id>1000110</id><name>Desk Lamp</name><price>19.5</price>"));
    assert!(xml.contains("<categoryid>100015</categoryid>"));
    assert!(xml.contains(
        "<attribute><name>attribute_set_name</name><value>Furniture</value></attribute>"
    ));
    assert!(xml.contains(
        "<attribute><name>news_from_date</name><value>2023-12-24 08:00:00</value></attribute>"
    ));
    assert!(!xml.contains("<value>2024-03-01</value>"));

    // Channel 2: the grouped child is reached through its parent despite being out of stock.
    assert!(xml.contains(&format!(
        "<item><id>{}</id><name>Desk Lamp Red</name>",
        item_id(2, 11)
    )));
    assert!(xml.contains(&format!(
        "<stock>0</stock><groupcode>{}</groupcode>",
        item_id(2, 12)
    )));
    assert!(!xml.contains(&format!("<id>{}</id>", item_id(2, 10))));
    assert!(!xml.contains(&format!("<id>{}</id>", item_id(1, 11))));

    assert_eq!(summary.disabled_channels, vec![3]);
    assert_eq!(summary.channels.len(), 2);
    assert_eq!(summary.exported_products(), 2);

    let main = &summary.channels[0];
    assert_eq!(main.channel_name, "Main");
    assert_eq!(main.products.seen, 2);
    assert_eq!(main.products.skipped_process, 1);
    let outlet = &summary.channels[1];
    assert_eq!(outlet.products.skipped_export, 1);
    assert_eq!(outlet.products.exported, 1);
}

#[test]
fn category_tree_is_shared_and_never_dangles() {
    let config = ExportConfig::from_toml_str(CONFIG).expect("config");
    let (xml, summary) = export(&config);

    assert_eq!(
        xml.matches("<category><categoryid>1</categoryid>").count(),
        1,
        "root is written exactly once"
    );
    assert!(xml.contains(concat!(
        "<category><categoryid>100012</categoryid><rank>2</rank>",
        "<name>Main - Default</name><parents><categoryid>1</categoryid></parents></category>"
    )));
    assert!(xml.contains(concat!(
        "<category><categoryid>100015</categoryid><rank>5</rank>",
        "<name>Lighting</name><parents><categoryid>100012</categoryid></parents></category>"
    )));
    assert!(xml.contains("<name>Outlet - Default</name>"));
    assert!(!xml.contains("Lost"));
    assert!(!xml.contains("Archive"));
    assert!(!xml.contains("Staging"));

    for channel in &summary.channels {
        assert_eq!(channel.categories.accepted, 2);
        assert_eq!(channel.categories.rejected_orphan, 1);
        assert_eq!(channel.categories.rejected_inactive, 1);
    }
    assert_eq!(summary.accepted_categories(), 4);
}

#[test]
fn single_channel_mode_ignores_website_links() {
    let config = ExportConfig::from_toml_str(&format!("single_channel_mode = true\n{CONFIG}"))
        .expect("config");
    let (xml, summary) = export(&config);

    assert!(xml.contains(&format!("<id>{}</id>", item_id(2, 10))));
    assert_eq!(summary.exported_products(), 3);
}

#[test]
fn invalid_date_aborts_but_leaves_balanced_markup() {
    let config = ExportConfig::from_toml_str(CONFIG).expect("config");
    let attribute_sets = AttributeSetNames::default();
    let mut broken = MemoryRowSource::new().with_rows(
        1,
        [RawRow::new()
            .with("entity_id", 1i64)
            .with("news_from_date", "next tuesday")],
    );
    let mut sink = XmlSink::new(Vec::new());

    let err = FeedExporter::new(&config, &attribute_sets)
        .export(&mut sink, &mut broken, &mut categories())
        .expect_err("invalid date");

    assert!(matches!(err, ExportError::InvalidDate { .. }));
    assert!(sink.open_elements().is_empty());
    let xml = String::from_utf8(sink.into_inner()).expect("utf8");
    assert!(xml.ends_with("</items></feed>"));
}

#[test]
fn exported_ids_decode_back_to_channel_and_entity() {
    assert_eq!(item_id(2, 11), "1000211");
    assert_eq!(decode_channel("1000211").expect("decode"), 2);
    assert_eq!(decode_entity("1000211").expect("decode"), 11);
    assert_eq!(decode_channel("11").expect("decode"), 0);
}
