mod address;
mod cart;
mod feedback;
mod pagination;
mod product;
mod state;
mod user;

pub use address::{Address, AddressInput, AddressLabel, AddressPatch};
pub use cart::{CartItem, ProductSnapshot, total_items};
pub use feedback::{Feedback, FeedbackStatus, PublicFeedback};
pub use pagination::{Page, PaginatedResponse, Pagination, SortOrder};
pub use product::{
    ColorInput, ColorVariant, Features, Media, Price, Product, ProductSummary, Rating, Shipping,
    SizeEntry, generate_product_code, parse_colors, parse_features, parse_sizes,
};
pub use state::AppState;
pub use user::{Provider, Role, User, UserProfile};
