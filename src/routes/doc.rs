use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        coupon::CouponKind,
        loyalty::LoyaltyTier,
        order_status::{OrderStatus, PaymentStatus},
        pricing::CartSummary,
        role::{ApplicationStatus, Role},
    },
    dto::{
        account::{CreateAddressRequest, CreatePaymentMethodRequest, UpdateProfileRequest},
        admin::{
            AuditLogList, DashboardSummary, InventoryAdjustRequest, LowStockQuery, StatusCount,
            UpdateOrderStatusRequest, UpdateRoleRequest,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{
            AddToCartRequest, AppliedCoupon, ApplyCouponRequest, CartItemDto, CartProduct,
            CartView, MergeCartRequest,
        },
        coupons::{
            CouponList, CouponQuote, CreateCouponRequest, UpdateCouponRequest,
            ValidateCouponRequest,
        },
        loyalty::LoyaltyAccount,
        orders::{
            CheckoutRequest, OrderList, OrderTracking, OrderWithItems, PayOrderRequest,
            TrackingStep,
        },
        products::{CategoryCount, CreateProductRequest, ProductList, UpdateProductRequest, VariantInput},
        vendor::{VendorApplicationList, VendorApplyRequest, VendorDecisionRequest},
        wishlist::{AddWishlistRequest, WishlistProductList, WishlistToggle},
    },
    models::{
        Address, AuditLog, Coupon, LoyaltyTransaction, Order, OrderItem, PaymentMethod, Product,
        ProductVariant, ShippingAddress, User, VendorApplication,
    },
    notifications::{NotificationKind, NotificationView},
    response::{ApiResponse, Meta},
    routes::{
        account, admin, auth, cart, coupons, health, loyalty, notifications, orders, params,
        products, vendor, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ancestral Heartbeat API",
        description = "Bilingual storefront for Colombian handicrafts"
    ),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        account::get_profile,
        account::update_profile,
        account::list_addresses,
        account::create_address,
        account::set_default_address,
        account::delete_address,
        account::list_payment_methods,
        account::create_payment_method,
        account::delete_payment_method,
        products::list_products,
        products::list_categories,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::merge_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::apply_coupon,
        cart::remove_coupon,
        coupons::validate_coupon,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        orders::cancel_order,
        orders::track_order,
        orders::download_invoice,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::toggle_wishlist,
        loyalty::get_account,
        notifications::list_notifications,
        notifications::dismiss_notification,
        vendor::apply,
        vendor::list_applications,
        vendor::decide,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::set_user_role,
        admin::list_coupons,
        admin::create_coupon,
        admin::update_coupon,
        admin::delete_coupon,
        admin::list_audit_logs,
        admin::dashboard
    ),
    components(
        schemas(
            Role,
            ApplicationStatus,
            OrderStatus,
            PaymentStatus,
            CouponKind,
            LoyaltyTier,
            CartSummary,
            User,
            Address,
            ShippingAddress,
            PaymentMethod,
            Product,
            ProductVariant,
            Coupon,
            Order,
            OrderItem,
            LoyaltyTransaction,
            VendorApplication,
            AuditLog,
            NotificationKind,
            NotificationView,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateAddressRequest,
            CreatePaymentMethodRequest,
            VariantInput,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CategoryCount,
            AddToCartRequest,
            MergeCartRequest,
            ApplyCouponRequest,
            CartProduct,
            CartItemDto,
            AppliedCoupon,
            CartView,
            ValidateCouponRequest,
            CouponQuote,
            CreateCouponRequest,
            UpdateCouponRequest,
            CouponList,
            CheckoutRequest,
            PayOrderRequest,
            OrderWithItems,
            OrderList,
            TrackingStep,
            OrderTracking,
            AddWishlistRequest,
            WishlistProductList,
            WishlistToggle,
            LoyaltyAccount,
            VendorApplyRequest,
            VendorDecisionRequest,
            VendorApplicationList,
            UpdateOrderStatusRequest,
            LowStockQuery,
            InventoryAdjustRequest,
            UpdateRoleRequest,
            StatusCount,
            DashboardSummary,
            AuditLogList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Account", description = "Profile, addresses and saved cards"),
        (name = "Products", description = "Bilingual catalog"),
        (name = "Cart", description = "Cart, totals and coupons"),
        (name = "Coupons", description = "Coupon validation"),
        (name = "Orders", description = "Checkout, payment, tracking and invoices"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Loyalty", description = "Points and tiers"),
        (name = "Notifications", description = "Short-lived user notifications"),
        (name = "Vendor", description = "Vendor applications"),
        (name = "Admin", description = "Staff endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/cart",
            "/api/orders/{id}/invoice",
            "/api/admin/orders/{id}/status",
            "/api/notifications/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
