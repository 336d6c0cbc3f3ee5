// crates/engine-core/tests/matching_scenarios.rs
use engine_core::{BookDepth, Decimal, Order, OrderBook, Side, Trade};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn order(id: &str, user: &str, side: Side, price: Decimal, qty: Decimal, ts: u64) -> Order {
    Order::new(id, user, "BTC", side, qty, price, ts)
}

fn submit_all(book: &mut OrderBook, orders: Vec<Order>) -> Vec<Trade> {
    let mut trades = Vec::new();
    for o in orders {
        trades.extend(book.submit(o).expect("valid order"));
    }
    trades
}

#[test]
fn ladder_of_buys_then_sells() {
    let mut book = OrderBook::new("BTC");

    let buys = vec![
        order("b1", "u1", Side::Buy, dec!(101.0), dec!(1.0), 0),
        order("b2", "u1", Side::Buy, dec!(102.0), dec!(2.0), 1),
        order("b3", "u1", Side::Buy, dec!(100.0), dec!(1.0), 3),
        order("b4", "u1", Side::Buy, dec!(99.0), dec!(1.0), 5),
        order("b5", "u1", Side::Buy, dec!(103.0), dec!(1.0), 7),
    ];
    let sells = vec![
        order("s1", "u2", Side::Sell, dec!(100.0), dec!(1.0), 0),
        order("s2", "u2", Side::Sell, dec!(102.0), dec!(1.0), 2),
        order("s3", "u2", Side::Sell, dec!(101.0), dec!(2.0), 4),
        order("s4", "u2", Side::Sell, dec!(105.0), dec!(1.0), 6),
        order("s5", "u2", Side::Sell, dec!(98.0), dec!(1.0), 8),
    ];

    assert!(submit_all(&mut book, buys).is_empty());
    let trades = submit_all(&mut book, sells);

    let summary: Vec<(&str, &str, Decimal, Decimal)> = trades
        .iter()
        .map(|t| (t.buy_order_id.as_str(), t.sell_order_id.as_str(), t.price, t.quantity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("b5", "s1", dec!(103), dec!(1)),
            ("b2", "s2", dec!(102), dec!(1)),
            ("b2", "s3", dec!(102), dec!(1)),
            ("b1", "s3", dec!(101), dec!(1)),
            ("b3", "s5", dec!(100), dec!(1)),
        ]
    );
    assert!(trades.iter().all(|t| t.buyer_id == "u1" && t.seller_id == "u2"));

    assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 1 });
    let snap = book.snapshot();
    assert_eq!(snap.bids[0].id, "b4");
    assert_eq!(snap.asks[0].id, "s4");
}

#[test]
fn sweep_across_levels_then_rest() {
    let mut book = OrderBook::new("BTC");
    submit_all(
        &mut book,
        vec![
            order("s1", "u2", Side::Sell, dec!(100.0), dec!(1.0), 1),
            order("s2", "u3", Side::Sell, dec!(100.5), dec!(1.5), 2),
            order("s3", "u4", Side::Sell, dec!(101.0), dec!(2.0), 3),
        ],
    );

    let trades = book.submit(order("b1", "u1", Side::Buy, dec!(100.5), dec!(4.0), 4)).unwrap();

    assert_eq!(trades.len(), 2);
    let filled: Decimal = trades.iter().map(|t| t.quantity).sum();
    assert_eq!(filled, dec!(2.5));
    assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 1 });
    assert_eq!(book.best_bid_price(), Some(dec!(100.5)));
    assert_eq!(book.snapshot().bids[0].quantity, dec!(1.5));
}

#[derive(Debug, Clone)]
struct OrderDraw {
    user: u8,
    buy: bool,
    price: u32,
    qty: u32,
}

fn order_draw() -> impl Strategy<Value = OrderDraw> {
    (0u8..3, any::<bool>(), 95u32..106, 1u32..10).prop_map(|(user, buy, price, qty)| OrderDraw {
        user,
        buy,
        price,
        qty,
    })
}

proptest! {
    #[test]
    fn quantity_is_conserved(draws in proptest::collection::vec(order_draw(), 1..80)) {
        let mut book = OrderBook::new("BTC");
        let mut submitted = Decimal::ZERO;
        let mut traded = Decimal::ZERO;

        for (i, s) in draws.iter().enumerate() {
            let side = if s.buy { Side::Buy } else { Side::Sell };
            let incoming = Order::new(
                format!("o{i}"),
                format!("u{}", s.user),
                "BTC",
                side,
                Decimal::new(s.qty as i64, 1),
                Decimal::from(s.price),
                i as u64,
            );
            submitted += incoming.quantity;

            let trades = book.submit(incoming.clone()).unwrap();
            let mut filled = Decimal::ZERO;
            for t in &trades {
                prop_assert!(t.quantity > Decimal::ZERO);
                prop_assert!(t.quantity <= incoming.quantity);
                prop_assert_ne!(&t.buyer_id, &t.seller_id);
                prop_assert!(side.crosses(incoming.price, t.price));
                filled += t.quantity;
            }
            prop_assert!(filled <= incoming.quantity);
            traded += filled;
        }

        let snap = book.snapshot();
        let resting: Decimal = snap.bids.iter().chain(snap.asks.iter()).map(|o| o.quantity).sum();
        prop_assert!(snap.bids.iter().chain(snap.asks.iter()).all(|o| o.quantity > Decimal::ZERO));
        prop_assert!(snap.bids.iter().all(|o| o.side == Side::Buy));
        prop_assert!(snap.asks.iter().all(|o| o.side == Side::Sell));
        prop_assert_eq!(submitted, traded + traded + resting);
    }

    #[test]
    fn snapshot_sides_are_in_priority_order(draws in proptest::collection::vec(order_draw(), 1..60)) {
        // Single user: nothing ever trades, everything rests.
        let mut book = OrderBook::new("BTC");
        for (i, s) in draws.iter().enumerate() {
            let side = if s.buy { Side::Buy } else { Side::Sell };
            let o = Order::new(format!("o{i}"), "u0", "BTC", side, Decimal::new(s.qty as i64, 1), Decimal::from(s.price), i as u64);
            prop_assert!(book.submit(o).unwrap().is_empty());
        }

        let snap = book.snapshot();
        prop_assert_eq!(snap.bids.len() + snap.asks.len(), draws.len());
        for w in snap.bids.windows(2) {
            prop_assert!(w[0].price > w[1].price
                || (w[0].price == w[1].price && w[0].timestamp_ns < w[1].timestamp_ns));
        }
        for w in snap.asks.windows(2) {
            prop_assert!(w[0].price < w[1].price
                || (w[0].price == w[1].price && w[0].timestamp_ns < w[1].timestamp_ns));
        }
    }
}
