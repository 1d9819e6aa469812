//! Envelopes of the two declarations: capital gains (Doh-KDVP) and
//! dividends (Doh-Div).

use chrono::Datelike;

use super::{PersonalInfo, XmlElement};
use crate::domain::{Decimal, Dividend, Lot};
use crate::engine::NormalizedLots;

pub const EDP_COMMON_NS: &str = "http://edavki.durs.si/Documents/Schemas/EDP-Common-1.xsd";
pub const DOH_KDVP_NS: &str = "http://edavki.durs.si/Documents/Schemas/Doh_KDVP_9.xsd";
pub const DOH_DIV_NS: &str = "http://edavki.durs.si/Documents/Schemas/Doh_Div_3.xsd";

/// Envelope root, header and the empty attachment and signature blocks.
/// Returns the root and the `body` element to be filled in.
fn envelope(namespace: &str, info: &PersonalInfo) -> (XmlElement, XmlElement) {
    let root = XmlElement::new("Envelope")
        .attr("xmlns", namespace)
        .attr("xmlns:edp", EDP_COMMON_NS)
        .child(info.header())
        .child(XmlElement::new("edp:AttachmentList"))
        .child(XmlElement::new("edp:Signatures"));
    let body = XmlElement::new("body").child(XmlElement::new("edp:bodyContent"));
    (root, body)
}

/// Capital-gains declaration built from the lots each ticker was matched from.
pub struct KdvpXml;

enum Entry {
    Purchase,
    Sale,
}

impl KdvpXml {
    /// One `KDVPItem` per ticker sold in `year`. Every purchase and sale up to
    /// the end of `year` is listed by date, purchases first on equal dates,
    /// and every sale carries the quantity still held after it.
    pub fn build(info: &PersonalInfo, ledgers: &[NormalizedLots], year: i32) -> XmlElement {
        let (root, mut body) = envelope(DOH_KDVP_NS, info);

        let sold: Vec<&NormalizedLots> = ledgers
            .iter()
            .filter(|lots| lots.sells.iter().any(|lot| lot.timestamp.year() == year))
            .collect();

        let kdvp = XmlElement::new("KDVP")
            .child(XmlElement::with_text("DocumentWorkflowID", "O"))
            .child(XmlElement::with_text("Year", year.to_string()))
            .child(XmlElement::with_text("PeriodStart", format!("{}-01-01", year)))
            .child(XmlElement::with_text("PeriodEnd", format!("{}-12-31", year)))
            .child(XmlElement::with_text("IsResident", "true"))
            .child(XmlElement::with_text("SecurityCount", sold.len().to_string()));

        let mut doh_kdvp = XmlElement::new("Doh_KDVP").child(kdvp);
        for lots in sold {
            doh_kdvp.push(Self::item(lots, year));
        }

        body.push(doh_kdvp);
        root.child(body)
    }

    fn item(lots: &NormalizedLots, year: i32) -> XmlElement {
        let attributes = &lots.attributes;

        let mut entries: Vec<(Entry, &Lot)> = lots
            .buys
            .iter()
            .map(|lot| (Entry::Purchase, lot))
            .chain(lots.sells.iter().map(|lot| (Entry::Sale, lot)))
            .filter(|(_, lot)| lot.timestamp.year() <= year)
            .collect();
        entries.sort_by_key(|(entry, lot)| (lot.timestamp, matches!(entry, Entry::Sale)));

        let mut securities = XmlElement::new("Securities")
            .child(XmlElement::with_text("ISIN", attributes.isin.as_str()))
            .child(XmlElement::with_text("Code", attributes.ticker.as_str()))
            .child(XmlElement::with_text("Name", attributes.name.as_str()))
            .child(XmlElement::with_text("IsFond", "false"));

        let mut held = Decimal::zero();
        for (id, (entry, lot)) in entries.into_iter().enumerate() {
            let date = lot.timestamp.date().to_string();
            let detail = match entry {
                Entry::Purchase => {
                    held += lot.quantity;
                    XmlElement::new("Purchase")
                        .child(XmlElement::with_text("F1", date))
                        .child(XmlElement::with_text("F2", "B"))
                        .child(XmlElement::with_text("F3", lot.quantity.to_string()))
                        .child(XmlElement::with_text("F4", lot.price_per_unit.to_fixed(4)))
                }
                Entry::Sale => {
                    held = held - lot.quantity;
                    XmlElement::new("Sale")
                        .child(XmlElement::with_text("F6", date))
                        .child(XmlElement::with_text("F7", lot.quantity.to_string()))
                        .child(XmlElement::with_text("F8", held.to_string()))
                        .child(XmlElement::with_text("F9", lot.price_per_unit.to_fixed(4)))
                }
            };
            securities.push(
                XmlElement::new("Row")
                    .child(XmlElement::with_text("ID", id.to_string()))
                    .child(detail),
            );
        }

        XmlElement::new("KDVPItem")
            .child(XmlElement::with_text("InventoryListType", "PLVP"))
            .child(XmlElement::with_text("Name", attributes.name.as_str()))
            .child(XmlElement::with_text("HasForeignTax", "false"))
            .child(securities)
    }
}

/// Dividend declaration.
pub struct DivDohXml;

impl DivDohXml {
    /// One `Dividend` entry per payment made in `year`.
    pub fn build(info: &PersonalInfo, dividends: &[Dividend], year: i32) -> XmlElement {
        let (root, mut body) = envelope(DOH_DIV_NS, info);

        body.push(
            XmlElement::new("Doh_Div").child(XmlElement::with_text("Period", year.to_string())),
        );

        for dividend in dividends.iter().filter(|d| d.year() == year) {
            body.push(
                XmlElement::new("Dividend")
                    .child(XmlElement::with_text(
                        "Date",
                        dividend.timestamp.date().to_string(),
                    ))
                    .child(XmlElement::with_text(
                        "PayerIdentificationNumber",
                        dividend.isin.as_str(),
                    ))
                    .child(XmlElement::with_text("PayerName", dividend.name.as_str()))
                    .child(XmlElement::with_text("Type", "1"))
                    .child(XmlElement::with_text("Value", dividend.gross().to_fixed(2)))
                    .child(XmlElement::with_text(
                        "ForeignTax",
                        dividend.withholding_tax.unwrap_or_default().to_fixed(2),
                    )),
            );
        }

        root.child(body)
    }
}
