//! Spanish/English text for API messages and notifications.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::{Uri, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "es" => Some(Locale::Es),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// First supported language in an `Accept-Language` value, by order of appearance.
    pub fn from_accept_language(value: &str) -> Option<Self> {
        value
            .split(',')
            .filter_map(|part| part.split(';').next())
            .find_map(Locale::parse)
    }

    /// `lang` from the query string, percent-decoded.
    fn from_uri(uri: &Uri) -> Option<Self> {
        let Query(query) = Query::<LangQuery>::try_from_uri(uri).ok()?;
        query.lang.as_deref().and_then(Locale::parse)
    }

    pub fn pick<'a>(&self, es: &'a str, en: Option<&'a str>) -> &'a str {
        match self {
            Locale::En => en.filter(|s| !s.is_empty()).unwrap_or(es),
            Locale::Es => es,
        }
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(locale) = Locale::from_uri(&parts.uri) {
            return Ok(locale);
        }
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Locale::from_accept_language)
            .unwrap_or_default();
        Ok(locale)
    }
}

#[derive(Debug, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Texts the service renders for users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum Message {
    OrderPlaced { invoice_number: String },
    PaymentReceived { invoice_number: String },
    OrderStatusChanged { invoice_number: String, status: String },
    OrderCancelled { invoice_number: String },
    PointsEarned { points: i64 },
    VendorApproved { shop_name: String },
    VendorRejected { shop_name: String },
    CouponApplied { code: String },
}

impl Message {
    pub fn title(&self, locale: Locale) -> &'static str {
        use Locale::*;
        match (self, locale) {
            (Message::OrderPlaced { .. }, Es) => "Pedido realizado",
            (Message::OrderPlaced { .. }, En) => "Order placed",
            (Message::PaymentReceived { .. }, Es) => "Pago recibido",
            (Message::PaymentReceived { .. }, En) => "Payment received",
            (Message::OrderStatusChanged { .. }, Es) => "Estado del pedido",
            (Message::OrderStatusChanged { .. }, En) => "Order status",
            (Message::OrderCancelled { .. }, Es) => "Pedido cancelado",
            (Message::OrderCancelled { .. }, En) => "Order cancelled",
            (Message::PointsEarned { .. }, Es) => "Puntos ganados",
            (Message::PointsEarned { .. }, En) => "Points earned",
            (Message::VendorApproved { .. }, Es) => "Solicitud aprobada",
            (Message::VendorApproved { .. }, En) => "Application approved",
            (Message::VendorRejected { .. }, Es) => "Solicitud rechazada",
            (Message::VendorRejected { .. }, En) => "Application rejected",
            (Message::CouponApplied { .. }, Es) => "Cupón aplicado",
            (Message::CouponApplied { .. }, En) => "Coupon applied",
        }
    }

    pub fn body(&self, locale: Locale) -> String {
        match (self, locale) {
            (Message::OrderPlaced { invoice_number }, Locale::Es) => {
                format!("Tu pedido {invoice_number} fue creado.")
            }
            (Message::OrderPlaced { invoice_number }, Locale::En) => {
                format!("Your order {invoice_number} was created.")
            }
            (Message::PaymentReceived { invoice_number }, Locale::Es) => {
                format!("Recibimos el pago del pedido {invoice_number}.")
            }
            (Message::PaymentReceived { invoice_number }, Locale::En) => {
                format!("We received payment for order {invoice_number}.")
            }
            (Message::OrderStatusChanged { invoice_number, status }, Locale::Es) => format!(
                "El pedido {invoice_number} ahora está: {}.",
                status_label(status, Locale::Es)
            ),
            (Message::OrderStatusChanged { invoice_number, status }, Locale::En) => format!(
                "Order {invoice_number} is now: {}.",
                status_label(status, Locale::En)
            ),
            (Message::OrderCancelled { invoice_number }, Locale::Es) => {
                format!("El pedido {invoice_number} fue cancelado.")
            }
            (Message::OrderCancelled { invoice_number }, Locale::En) => {
                format!("Order {invoice_number} was cancelled.")
            }
            (Message::PointsEarned { points }, Locale::Es) => {
                format!("Ganaste {points} puntos de fidelidad.")
            }
            (Message::PointsEarned { points }, Locale::En) => {
                format!("You earned {points} loyalty points.")
            }
            (Message::VendorApproved { shop_name }, Locale::Es) => {
                format!("La tienda {shop_name} ya puede vender.")
            }
            (Message::VendorApproved { shop_name }, Locale::En) => {
                format!("{shop_name} can now sell.")
            }
            (Message::VendorRejected { shop_name }, Locale::Es) => {
                format!("La solicitud de {shop_name} no fue aprobada.")
            }
            (Message::VendorRejected { shop_name }, Locale::En) => {
                format!("The application for {shop_name} was not approved.")
            }
            (Message::CouponApplied { code }, Locale::Es) => format!("Se aplicó el cupón {code}."),
            (Message::CouponApplied { code }, Locale::En) => format!("Coupon {code} applied."),
        }
    }
}

pub fn status_label(status: &str, locale: Locale) -> &str {
    match (status, locale) {
        ("pending", Locale::Es) => "pendiente",
        ("processing", Locale::Es) => "en preparación",
        ("shipped", Locale::Es) => "enviado",
        ("delivered", Locale::Es) => "entregado",
        ("cancelled", Locale::Es) => "cancelado",
        (other, _) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_picks_first_supported() {
        assert_eq!(
            Locale::from_accept_language("fr-FR,en-US;q=0.8,es;q=0.5"),
            Some(Locale::En)
        );
        assert_eq!(Locale::from_accept_language("es-CO"), Some(Locale::Es));
        assert_eq!(Locale::from_accept_language("de"), None);
    }

    fn uri(s: &str) -> Uri {
        s.parse().expect("uri")
    }

    #[test]
    fn query_lang_is_read() {
        assert_eq!(Locale::from_uri(&uri("/p?page=2&lang=en")), Some(Locale::En));
        assert_eq!(Locale::from_uri(&uri("/p?page=2")), None);
        assert_eq!(Locale::from_uri(&uri("/p")), None);
    }

    #[test]
    fn query_lang_is_percent_decoded() {
        assert_eq!(Locale::from_uri(&uri("/p?lang=%65n")), Some(Locale::En));
        assert_eq!(Locale::from_uri(&uri("/p?lang=en%2DUS")), Some(Locale::En));
    }

    #[tokio::test]
    async fn extractor_prefers_query_over_header() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/api/products?lang=%65s")
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .body(())
            .expect("request")
            .into_parts();
        let locale = Locale::from_request_parts(&mut parts, &()).await;
        assert_eq!(locale, Ok(Locale::Es));

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/api/products")
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .body(())
            .expect("request")
            .into_parts();
        assert_eq!(Locale::from_request_parts(&mut parts, &()).await, Ok(Locale::En));
    }

    #[test]
    fn english_falls_back_to_spanish() {
        assert_eq!(Locale::En.pick("Mochila wayuu", None), "Mochila wayuu");
        assert_eq!(Locale::En.pick("Mochila wayuu", Some("")), "Mochila wayuu");
        assert_eq!(Locale::En.pick("Mochila wayuu", Some("Wayuu bag")), "Wayuu bag");
        assert_eq!(Locale::Es.pick("Mochila wayuu", Some("Wayuu bag")), "Mochila wayuu");
    }

    #[test]
    fn status_messages_are_localized() {
        let msg = Message::OrderStatusChanged {
            invoice_number: "INV-1".into(),
            status: "shipped".into(),
        };
        assert_eq!(msg.body(Locale::Es), "El pedido INV-1 ahora está: enviado.");
        assert_eq!(msg.body(Locale::En), "Order INV-1 is now: shipped.");
    }
}
