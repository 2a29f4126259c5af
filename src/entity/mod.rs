pub mod addresses;
pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod coupons;
pub mod loyalty_transactions;
pub mod order_items;
pub mod orders;
pub mod payment_methods;
pub mod product_variants;
pub mod products;
pub mod users;
pub mod vendor_applications;
pub mod wishlist_items;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use coupons::Entity as Coupons;
pub use loyalty_transactions::Entity as LoyaltyTransactions;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payment_methods::Entity as PaymentMethods;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use users::Entity as Users;
pub use vendor_applications::Entity as VendorApplications;
pub use wishlist_items::Entity as WishlistItems;
