use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use fulfillment::analytics::{rank_best_sellers, SaleLine, BEST_SELLER_LIMIT};
use fulfillment::models::{CartLine, Product, ProductSummary, ShippingFee};
use fulfillment::pricing::quote;
use fulfillment::{register_checkout_pipeline, run_checkout, Actor, InMemoryStore, InventoryLedger, PipelineRegistry, Store};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

fn cart(lines: usize) -> (Vec<CartLine>, Vec<Product>) {
  let user_id = Uuid::new_v4();
  (0..lines)
    .map(|i| {
      let product = Product {
        id: Uuid::new_v4(),
        name: format!("product_{}", i),
        price_cents: 199 + i as i64,
        stock: 1_000,
      };
      let line = CartLine {
        id: Uuid::new_v4(),
        user_id,
        product_id: product.id,
        quantity: (i % 7) as i32 + 1,
      };
      (line, product)
    })
    .unzip()
}

fn sales(lines: usize, distinct_products: usize) -> Vec<SaleLine> {
  let products: Vec<ProductSummary> = (0..distinct_products)
    .map(|i| ProductSummary {
      id: Uuid::new_v4(),
      name: format!("product_{}", i),
      price_cents: 100,
      stock: 10,
    })
    .collect();
  (0..lines)
    .map(|i| {
      let product = &products[i % distinct_products];
      SaleLine {
        product_id: product.id,
        quantity: (i % 5) as i32 + 1,
        product: Some(product.clone()),
      }
    })
    .collect()
}

fn bench_pricing(c: &mut Criterion) {
  let mut group = c.benchmark_group("Pricing");
  let fee = ShippingFee { delivery_fee_cents: 499 };

  for num_lines in [1usize, 10, 100] {
    let (lines, products) = cart(num_lines);
    group.throughput(Throughput::Elements(num_lines as u64));
    group.bench_with_input(BenchmarkId::new("quote", num_lines), &num_lines, |b, _| {
      b.iter(|| quote(lines.iter().zip(products.iter()), Some(&fee)))
    });
  }
  group.finish();
}

fn bench_best_seller_ranking(c: &mut Criterion) {
  let mut group = c.benchmark_group("BestSellerRanking");

  for (num_lines, distinct) in [(100usize, 10usize), (10_000, 100), (10_000, 5_000)] {
    let input = sales(num_lines, distinct);
    group.throughput(Throughput::Elements(num_lines as u64));
    group.bench_with_input(
      BenchmarkId::new("rank", format!("{}_lines_{}_products", num_lines, distinct)),
      &input,
      |b, input| b.iter_batched(|| input.clone(), |lines| rank_best_sellers(lines, BEST_SELLER_LIMIT), BatchSize::SmallInput),
    );
  }
  group.finish();
}

fn bench_in_memory_checkout(c: &mut Criterion) {
  let mut group = c.benchmark_group("InMemoryCheckout");
  let rt = Runtime::new().unwrap();
  let registry = PipelineRegistry::new();
  register_checkout_pipeline(&registry);

  for num_lines in [1usize, 10] {
    group.bench_with_input(BenchmarkId::new("checkout", num_lines), &num_lines, |b, &num_lines| {
      b.iter_batched(
        || {
          let store = InMemoryStore::new();
          let actor = Actor::customer(Uuid::new_v4());
          store.add_user(actor.user_id);
          for i in 0..num_lines {
            let product = store.add_product(&format!("product_{}", i), 250, 100);
            store.add_to_cart(actor.user_id, product.id, 2);
          }
          store.set_shipping_fee(Some(300));
          (Arc::new(store) as Arc<dyn Store>, actor)
        },
        |(store, actor)| {
          rt.block_on(run_checkout(&registry, store, InventoryLedger::default(), &actor, None))
            .unwrap()
        },
        BatchSize::SmallInput,
      )
    });
  }
  group.finish();
}

criterion_group!(benches, bench_pricing, bench_best_seller_ranking, bench_in_memory_checkout);
criterion_main!(benches);
