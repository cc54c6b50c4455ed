use rust_decimal::Decimal;

use super::*;
use crate::catalog::PriceRecordId;
use crate::combination::CombinationKey;
use crate::desired::{AxisTags, DesiredPrice};
use crate::error::ErrorKind;
use crate::memory::{MemoryCatalog, MemoryOp};

struct Fixture {
    catalog: MemoryCatalog,
    product: ProductId,
    color: AxisId,
    size: AxisId,
    material: AxisId,
}

fn fixture() -> Fixture {
    let mut catalog = MemoryCatalog::new();
    let color = catalog.add_axis("Color");
    let size = catalog.add_axis("Size");
    let material = catalog.add_axis("Material");
    let product = catalog.add_product();
    Fixture {
        catalog,
        product,
        color,
        size,
        material,
    }
}

fn axis(id: AxisId, tags: &[&str]) -> AxisTags {
    AxisTags {
        option: id,
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
    }
}

fn price(title: &str, price: i64, stock: i64) -> DesiredPrice {
    DesiredPrice {
        title: title.to_string(),
        price: Decimal::from(price),
        stock,
    }
}

fn state(axes: Vec<AxisTags>, prices: Vec<DesiredPrice>) -> DesiredState {
    DesiredState {
        product_variant: axes,
        product_variant_prices: prices,
    }
}

fn record_for(catalog: &MemoryCatalog, product: ProductId, title: &str) -> Option<(PriceRecordId, Decimal, i64)> {
    let snapshot = catalog.snapshot(product);
    let key = CombinationKey::parse(title);
    snapshot
        .price_records
        .iter()
        .find(|r| snapshot.record_key(r) == key)
        .map(|r| (r.id, r.price, r.stock))
}

#[tokio::test]
async fn create_from_empty_state() {
    let mut f = fixture();
    let desired = state(
        vec![axis(f.color, &["Red", "Blue"]), axis(f.size, &["Large"])],
        vec![price("Red/Large/", 10, 5), price("Blue/Large/", 12, 0)],
    );

    let summary = f
        .catalog
        .reconcile(f.product, &desired)
        .await
        .expect("reconcile failed");

    assert_eq!(summary.tags_added.len(), 3);
    assert_eq!(summary.prices_added.len(), 2);
    assert!(summary.tags_removed.is_empty());
    assert_eq!(f.catalog.snapshot(f.product).price_records.len(), 2);
}

#[tokio::test]
async fn second_identical_call_is_a_noop() {
    let mut f = fixture();
    let desired = state(
        vec![axis(f.color, &["Red", "Blue"]), axis(f.size, &["Large", "Small"])],
        vec![
            price("Red/Large/", 10, 5),
            price("Blue/Small/", 12, 1),
            price("Large/Blue/", 11, 2),
        ],
    );

    f.catalog
        .reconcile(f.product, &desired)
        .await
        .expect("first reconcile failed");
    let before = f.catalog.snapshot(f.product);

    let summary = f
        .catalog
        .reconcile(f.product, &desired)
        .await
        .expect("second reconcile failed");

    assert!(summary.is_noop(), "expected no changes, got {summary:?}");
    assert_eq!(summary.prices_unchanged, 3);
    assert_eq!(f.catalog.snapshot(f.product), before);
}

#[tokio::test]
async fn reordered_titles_hit_the_same_record() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red"]), axis(f.size, &["Large"])],
                vec![price("Red/Large/", 10, 5)],
            ),
        )
        .await
        .expect("first reconcile failed");
    let (original_id, _, _) = record_for(&f.catalog, f.product, "Red/Large/").expect("record exists");

    let summary = f
        .catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red"]), axis(f.size, &["Large"])],
                vec![price("Large/Red", 14, 5)],
            ),
        )
        .await
        .expect("second reconcile failed");

    assert_eq!(summary.prices_updated.len(), 1);
    assert!(summary.prices_added.is_empty());
    assert!(summary.prices_removed.is_empty());
    let (id, price, _) = record_for(&f.catalog, f.product, "Red/Large/").expect("record exists");
    assert_eq!(id, original_id);
    assert_eq!(price, Decimal::from(14));
}

#[tokio::test]
async fn read_back_matches_reconciled_state() {
    let mut f = fixture();
    let desired = state(
        vec![
            axis(f.color, &["Red", "Blue"]),
            axis(f.size, &["Large"]),
            axis(f.material, &["Cotton"]),
        ],
        vec![
            price("Red/Large/Cotton/", 30, 1),
            price("Cotton/Blue/Large/", 31, 2),
            price("Red/", 9, 9),
        ],
    );

    f.catalog
        .reconcile(f.product, &desired)
        .await
        .expect("reconcile failed");

    let read_back = f.catalog.snapshot(f.product).to_desired_state();
    assert_eq!(
        read_back.normalize().expect("read-back is valid"),
        desired.normalize().expect("desired is valid")
    );
}

#[tokio::test]
async fn partial_change_keeps_identity_of_surviving_combination() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["A"]), axis(f.size, &["B", "C"])],
                vec![price("A/B/", 10, 1), price("A/C/", 20, 1)],
            ),
        )
        .await
        .expect("first reconcile failed");
    let (ab_id, _, _) = record_for(&f.catalog, f.product, "A/B/").expect("A/B exists");

    let summary = f
        .catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["A"]), axis(f.size, &["B", "D"])],
                vec![price("A/B/", 15, 1), price("A/D/", 30, 1)],
            ),
        )
        .await
        .expect("second reconcile failed");

    let (id, price_ab, _) = record_for(&f.catalog, f.product, "A/B/").expect("A/B survives");
    assert_eq!(id, ab_id, "A/B must be updated in place");
    assert_eq!(price_ab, Decimal::from(15));
    assert!(record_for(&f.catalog, f.product, "A/C/").is_none());
    let (_, price_ad, _) = record_for(&f.catalog, f.product, "A/D/").expect("A/D created");
    assert_eq!(price_ad, Decimal::from(30));

    assert_eq!(summary.prices_updated.len(), 1);
    assert_eq!(summary.prices_removed, vec![CombinationKey::parse("A/C/")]);
    assert_eq!(summary.prices_added.len(), 1);
    assert_eq!(summary.tags_removed, vec![TagRef::new(f.size, "C")]);
}

#[tokio::test]
async fn removing_an_axis_cascades_to_its_records() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red"]), axis(f.size, &["Large", "Small"])],
                vec![price("Red/Large/", 10, 1), price("Red/Small/", 11, 1)],
            ),
        )
        .await
        .expect("first reconcile failed");

    let summary = f
        .catalog
        .reconcile(
            f.product,
            &state(vec![axis(f.color, &["Red"])], vec![price("Red/", 9, 1)]),
        )
        .await
        .expect("second reconcile failed");

    assert_eq!(summary.axes_removed, vec![f.size]);
    assert_eq!(summary.tags_removed.len(), 2);
    assert_eq!(summary.prices_removed.len(), 2);

    let snapshot = f.catalog.snapshot(f.product);
    assert!(snapshot.tags.iter().all(|t| t.axis_id == f.color));
    assert_eq!(snapshot.price_records.len(), 1);
    assert_eq!(
        snapshot.record_key(&snapshot.price_records[0]),
        CombinationKey::parse("Red/")
    );
}

#[tokio::test]
async fn four_titles_fail_without_touching_state() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(vec![axis(f.color, &["Red"])], vec![price("Red/", 1, 1)]),
        )
        .await
        .expect("seed reconcile failed");
    let before = f.catalog.snapshot(f.product);

    let err = f
        .catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red", "Blue"])],
                vec![price("Red/Large/Cotton/Silk/", 1, 1)],
            ),
        )
        .await
        .expect_err("four titles must fail");

    assert_eq!(err.kind(), ErrorKind::TooManyAxes);
    assert_eq!(f.catalog.snapshot(f.product), before);
}

#[tokio::test]
async fn failed_price_creation_rolls_back_everything() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(vec![axis(f.color, &["Red"])], vec![price("Red/", 1, 1)]),
        )
        .await
        .expect("seed reconcile failed");
    let before = f.catalog.snapshot(f.product);

    f.catalog.fail_on(MemoryOp::CreatePriceRecord, 1);
    let err = f
        .catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Blue", "Green"]), axis(f.size, &["Large"])],
                vec![
                    price("Blue/Large/", 1, 1),
                    price("Green/Large/", 2, 2),
                    price("Large/", 3, 3),
                ],
            ),
        )
        .await
        .expect_err("second price creation must fail");

    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(err.phase(), Some(Phase::SyncPrices));
    assert_eq!(f.catalog.snapshot(f.product), before);
}

#[tokio::test]
async fn failed_tag_removal_rolls_back_price_changes() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red", "Blue"])],
                vec![price("Red/", 1, 1), price("Blue/", 2, 2)],
            ),
        )
        .await
        .expect("seed reconcile failed");
    let before = f.catalog.snapshot(f.product);

    f.catalog.fail_on(MemoryOp::DeleteTags, 0);
    let err = f
        .catalog
        .reconcile(
            f.product,
            &state(vec![axis(f.color, &["Red"])], vec![price("Red/", 5, 5)]),
        )
        .await
        .expect_err("tag removal must fail");

    assert_eq!(err.phase(), Some(Phase::RemoveTags));
    assert_eq!(f.catalog.snapshot(f.product), before);
}

#[tokio::test]
async fn unknown_axis_is_not_found() {
    let mut f = fixture();
    let err = f
        .catalog
        .reconcile(f.product, &state(vec![axis(AxisId(999), &["Red"])], vec![]))
        .await
        .expect_err("unknown axis must fail");

    assert!(matches!(err, ReconcileError::NotFound { entity: "variant axis", .. }));
    assert!(f.catalog.snapshot(f.product).tags.is_empty());
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let mut f = fixture();
    let err = f
        .catalog
        .reconcile(ProductId(12_345), &DesiredState::default())
        .await
        .expect_err("unknown product must fail");

    assert!(matches!(err, ReconcileError::NotFound { entity: "product", .. }));
}

#[tokio::test]
async fn new_combination_can_use_tag_added_in_same_call() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(vec![axis(f.color, &["Red"])], vec![price("Red/", 1, 1)]),
        )
        .await
        .expect("seed reconcile failed");

    let summary = f
        .catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Blue"])],
                vec![price("Blue/", 2, 2)],
            ),
        )
        .await
        .expect("swap reconcile failed");

    assert_eq!(summary.tags_added, vec![TagRef::new(f.color, "Blue")]);
    assert_eq!(summary.tags_removed, vec![TagRef::new(f.color, "Red")]);
    assert_eq!(summary.prices_removed, vec![CombinationKey::parse("Red/")]);

    let snapshot = f.catalog.snapshot(f.product);
    assert_eq!(snapshot.price_records.len(), 1);
    assert_eq!(
        snapshot.slot_titles(&snapshot.price_records[0]),
        vec!["Blue".to_string()]
    );
}

#[tokio::test]
async fn empty_desired_state_clears_product() {
    let mut f = fixture();
    f.catalog
        .reconcile(
            f.product,
            &state(
                vec![axis(f.color, &["Red"]), axis(f.size, &["Large"])],
                vec![price("Red/Large/", 1, 1)],
            ),
        )
        .await
        .expect("seed reconcile failed");

    let summary = f
        .catalog
        .reconcile(f.product, &DesiredState::default())
        .await
        .expect("clearing reconcile failed");

    assert_eq!(summary.axes_removed.len(), 2);
    assert_eq!(f.catalog.snapshot(f.product), ProductSnapshot::new(f.product, vec![], vec![]));
}

#[tokio::test]
async fn other_products_are_untouched() {
    let mut f = fixture();
    let other = f.catalog.add_product();
    let desired = state(vec![axis(f.color, &["Red"])], vec![price("Red/", 1, 1)]);
    f.catalog
        .reconcile(other, &desired)
        .await
        .expect("other reconcile failed");
    let other_before = f.catalog.snapshot(other);

    f.catalog
        .reconcile(f.product, &state(vec![axis(f.color, &["Blue"])], vec![]))
        .await
        .expect("reconcile failed");

    assert_eq!(f.catalog.snapshot(other), other_before);
}

#[test]
fn plan_is_pure_and_reports_noop() {
    let snapshot = ProductSnapshot::default();
    let planned = plan(&snapshot, &NormalizedDesired::default()).expect("empty plan");
    assert!(planned.is_noop());
}

#[tokio::test]
async fn prepare_plans_without_mutating() {
    let mut f = fixture();
    let desired = state(
        vec![axis(f.color, &["Red"]), axis(f.material, &["Wool"])],
        vec![price("Red/Wool/", 40, 2)],
    );

    let (snapshot, planned) = {
        let mut tx = f.catalog.begin();
        let prepared = prepare(&mut tx, f.product, &desired)
            .await
            .expect("prepare failed");
        tx.commit();
        prepared
    };

    assert!(snapshot.tags.is_empty());
    assert_eq!(planned.tags.to_add.len(), 2);
    assert_eq!(planned.prices.to_add.len(), 1);
    assert!(f.catalog.snapshot(f.product).tags.is_empty());
    assert!(f.catalog.snapshot(f.product).price_records.is_empty());
}

#[tokio::test]
async fn sub_cent_prices_are_kept_verbatim_and_idempotent() {
    let mut f = fixture();
    let desired = state(
        vec![axis(f.color, &["Red"])],
        vec![DesiredPrice {
            title: "Red/".to_string(),
            price: Decimal::new(10_555, 3),
            stock: 1,
        }],
    );

    f.catalog
        .reconcile(f.product, &desired)
        .await
        .expect("first reconcile failed");
    let (_, stored, _) = record_for(&f.catalog, f.product, "Red/").expect("record exists");
    assert_eq!(stored, Decimal::new(10_555, 3));
    assert_eq!(stored.scale(), 3);

    let second = f
        .catalog
        .reconcile(f.product, &desired)
        .await
        .expect("second reconcile failed");
    assert!(second.is_noop(), "unexpected changes: {second:?}");
    assert_eq!(second.prices_unchanged, 1);
}
