use criterion::{Criterion, criterion_group, criterion_main};
use domain::{ClaimResponseBody, parse_offer_list};
use serde_json::{Value, json};

fn offer_record(i: usize) -> Value {
    json!({
        "_id": format!("offer-{i:04}"),
        "title": format!("Offer {i}"),
        "discount": 15,
        "discountType": "percentage",
        "products": [format!("p-{i}-a"), { "_id": format!("p-{i}-b") }],
        "startDate": "2026-01-01T00:00:00Z",
        "endDate": "2026-12-31T23:59:59Z",
        "isActive": true,
        "claimedBy": [{ "userId": "u1", "claimedAt": "2026-02-01T10:00:00Z" }]
    })
}

fn offer_list_body(count: usize, malformed_every: usize) -> String {
    let offers: Vec<Value> = (0..count)
        .map(|i| {
            let mut record = offer_record(i);
            if malformed_every > 0 && i % malformed_every == 0 {
                record.as_object_mut().unwrap().remove("title");
            }
            record
        })
        .collect();
    json!({ "success": true, "data": { "offers": offers } }).to_string()
}

fn bench_parse_offer_list(c: &mut Criterion) {
    let body = offer_list_body(100, 0);

    c.bench_function("domain/parse_offer_list_100", |b| {
        b.iter(|| parse_offer_list(&body).unwrap());
    });
}

fn bench_parse_offer_list_with_malformed(c: &mut Criterion) {
    let body = offer_list_body(100, 5);

    c.bench_function("domain/parse_offer_list_100_malformed_20pct", |b| {
        b.iter(|| parse_offer_list(&body).unwrap());
    });
}

fn bench_parse_claim_response(c: &mut Criterion) {
    let items: Vec<Value> = (0..20)
        .map(|i| json!({ "productId": format!("p-{i}"), "quantity": 1 }))
        .collect();
    let body = json!({
        "success": true,
        "data": { "addedProducts": ["p-1", "p-2"], "cart": { "items": items } }
    })
    .to_string();

    c.bench_function("domain/parse_claim_response", |b| {
        b.iter(|| ClaimResponseBody::parse(&body));
    });
}

criterion_group!(
    benches,
    bench_parse_offer_list,
    bench_parse_offer_list_with_malformed,
    bench_parse_claim_response,
);
criterion_main!(benches);
