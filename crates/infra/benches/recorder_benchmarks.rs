use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use backoffice_core::{ProductCode, UnitAmount};
use backoffice_infra::store::{CatalogEditor, InMemoryBackOffice};
use backoffice_infra::OrderRecorder;
use backoffice_products::{Product, Stock};
use backoffice_purchasing::{PurchaseDraft, PurchaseLineDraft};
use backoffice_sales::{SaleDraft, SaleLineDraft};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

const PRODUCTS: usize = 20;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn product_code(i: usize) -> String {
    format!("P-{i:03}")
}

async fn seeded_store() -> (InMemoryBackOffice, i32, i32, i32) {
    let store = InMemoryBackOffice::new();
    for i in 0..PRODUCTS {
        store
            .create_product(&Product {
                code: ProductCode::new(product_code(i)).unwrap(),
                description: format!("Producto {i}"),
                category: None,
                unit_of_measure: None,
                on_hand: Stock::new(Decimal::from(1_000_000)).unwrap(),
                purchase_cost: UnitAmount::new(Decimal::ONE).unwrap(),
                sale_price: UnitAmount::new(Decimal::TWO).unwrap(),
            })
            .await
            .unwrap();
    }
    let customer = store.add_customer("Cliente").await.unwrap();
    let employee = store.add_employee("Empleado").await.unwrap();
    let supplier = store.add_supplier("Proveedor").await.unwrap();
    (store, customer.get(), employee.get(), supplier.get())
}

fn sale_draft(customer: i32, employee: i32, lines: usize) -> SaleDraft {
    SaleDraft {
        customer_id: customer,
        employee_id: employee,
        lines: (0..lines)
            .map(|i| SaleLineDraft {
                product_code: product_code(i % PRODUCTS),
                quantity: Decimal::ONE,
                notes: None,
            })
            .collect(),
    }
}

fn purchase_draft(supplier: i32, employee: i32, lines: usize) -> PurchaseDraft {
    PurchaseDraft {
        supplier_id: supplier,
        employee_id: employee,
        lot: None,
        lines: (0..lines)
            .map(|i| PurchaseLineDraft {
                product_code: product_code(i % PRODUCTS),
                quantity: Decimal::ONE,
                unit_cost: None,
            })
            .collect(),
    }
}

fn bench_record_sale(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("record_sale");

    for lines in [1usize, 5, 20] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter_batched(
                || {
                    let (store, customer, employee, _) = rt.block_on(seeded_store());
                    (OrderRecorder::new(store), sale_draft(customer, employee, lines))
                },
                |(recorder, draft)| {
                    rt.block_on(async { black_box(recorder.record_sale(&draft).await.unwrap()) })
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_sale_and_restock(c: &mut Criterion) {
    let rt = runtime();
    let (store, customer, employee, supplier) = rt.block_on(seeded_store());
    let recorder = OrderRecorder::new(store);
    let sale = sale_draft(customer, employee, 5);
    let purchase = purchase_draft(supplier, employee, 5);

    c.bench_function("sale_then_restock_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(recorder.record_sale(&sale).await.unwrap());
                black_box(recorder.record_purchase(&purchase).await.unwrap());
            })
        })
    });
}

criterion_group!(benches, bench_record_sale, bench_sale_and_restock);
criterion_main!(benches);
