use criterion::{criterion_group, criterion_main, Criterion};
use quickhire_payments::i18n::{Language, Translator};
use quickhire_payments::models::{AuthUser, Price, PriceInterval, Product, SubscriptionStatus};
use quickhire_payments::services::{pricing_plans, should_attempt_recovery};
use std::hint::black_box;

fn benchmark_recovery_heuristic(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery_heuristic");

    // Matches in the first bucket
    group.bench_function("permission_denied", |b| {
        b.iter(|| {
            should_attempt_recovery(
                black_box("7 PERMISSION_DENIED: Missing or insufficient permissions."),
                black_box(Some("permission-denied")),
            )
        })
    });

    // Falls through every bucket
    group.bench_function("unclassified_long_message", |b| {
        let message = "The card was declined by the issuing bank. ".repeat(20);
        b.iter(|| should_attempt_recovery(black_box(&message), black_box(Some("card_declined"))))
    });

    group.finish();
}

fn benchmark_pricing_plans(c: &mut Criterion) {
    let products: Vec<Product> = (0..20)
        .map(|i| {
            let price = |interval: PriceInterval, amount: i64| Price {
                id: format!("price_{}_{:?}", i, interval),
                active: true,
                currency: "usd".to_string(),
                unit_amount: amount,
                interval: Some(interval),
                interval_count: Some(1),
                price_type: Default::default(),
            };
            Product {
                id: format!("prod_{}", i),
                name: format!("Plan {}", i),
                description: String::new(),
                active: true,
                images: Vec::new(),
                metadata: [
                    ("firebaseRole".to_string(), format!("role_{}", i)),
                    ("jobs".to_string(), "Unlimited job posts".to_string()),
                ]
                .into_iter()
                .collect(),
                prices: vec![price(PriceInterval::Month, 2000), price(PriceInterval::Year, 20000)],
            }
        })
        .collect();
    let user = AuthUser::new("u1").with_stripe_role("role_7");
    let translator = Translator::new(Language::English);

    c.bench_function("pricing_plans_20_products", |b| {
        b.iter(|| {
            pricing_plans(
                black_box(&products),
                Some(SubscriptionStatus::Active),
                Some(&user),
                &translator,
            )
        })
    });
}

criterion_group!(benches, benchmark_recovery_heuristic, benchmark_pricing_plans);
criterion_main!(benches);
