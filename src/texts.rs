//! User-facing message copy
//!
//! Messages are sent in HTML parse mode; anything user- or catalog-supplied
//! is escaped before it is embedded.

use crate::catalog::ProductRecord;
use crate::report::format::{escape_html, format_amount, format_plain};
use crate::state_machine::state::{PendingProduct, Quantity};
use std::fmt::Write;

pub const ADMIN_ONLY: &str = "Assalomu alaykum! Bu bot faqat admin uchun.";
pub const MAIN_MENU: &str = "Bosh menyu";
pub const ASK_PRODUCT_CODE: &str = "Mahsulot ma'lumotini ko'rish uchun uning kodini yuboring:";
pub const PRODUCT_NOT_FOUND: &str = "❌ Bunday kodli mahsulot topilmadi.";
pub const ASK_SALESPERSON_NAME: &str = "Sotuvchi (yoki xaridor) ism-sharifini kiriting:";
pub const ASK_FIRST_CODE: &str = "Rahmat. Endi birinchi mahsulot kodini kiriting:";
pub const CODE_NOT_FOUND_RETRY: &str =
    "❌ Bunday kodli mahsulot topilmadi. Boshqa kod kiriting yoki tugatish uchun pastdagi tugmani bosing.";
pub const CHOOSE_QUANTITY_WITH_BUTTONS: &str = "Iltimos, sonini pastdagi tugmalar orqali tanlang:";
pub const EMPTY_INPUT: &str = "Bo'sh xabar qabul qilinmaydi, qaytadan kiriting:";
pub const NOTHING_ADDED: &str = "Hech qanday mahsulot qo'shilmadi.";
pub const REPORT_IN_PROGRESS: &str = "Hisobot tayyorlanmoqda, iltimos kuting...";
pub const REPORT_DONE: &str = "Yangi hisobot uchun bosh menyuga qayting.";
pub const REPORT_TITLE_CAPTION: &str = "📊 Sotuv hisoboti";

pub fn greeting(display_name: &str) -> String {
    format!("Assalomu alaykum, <b>{}</b>!", escape_html(display_name))
}

/// Details shown by the view-product dialog
pub fn product_details(product: &ProductRecord) -> String {
    let mut text = format!(
        "<b>Mahsulot (RU):</b> {}\n<b>Product (EN):</b> {}\n(kod: {})\n\n",
        escape_html(&product.name.ru),
        escape_html(&product.name.en),
        escape_html(&product.code)
    );
    if let Some(volume) = product.volume {
        let _ = writeln!(text, "<b>Hajmi:</b> {} ml", format_plain(volume));
    }
    let _ = write!(
        text,
        "<b>Ichki narx:</b> {} so'm\n<b>Tashqi narx:</b> {} so'm\n<b>Ball:</b> {} ⭐",
        format_amount(product.internal_price),
        format_amount(product.external_price),
        format_plain(product.points)
    );
    text
}

pub fn product_found_choose_quantity(pending: &PendingProduct) -> String {
    format!(
        "✅ Mahsulot topildi:\n<b>{}\n{}</b>\n\nEndi shu mahsulotdan necha dona sotilganini tanlang:",
        escape_html(&pending.name_ru),
        escape_html(&pending.name_en)
    )
}

pub fn line_item_added(pending: &PendingProduct, quantity: Quantity) -> String {
    format!(
        "✅ Qo'shildi: <b>{} / {}</b> - {quantity} dona.\n\nNavbatdagi mahsulot kodini kiriting:",
        escape_html(&pending.name_ru),
        escape_html(&pending.name_en)
    )
}

pub fn report_failed(reason: &str) -> String {
    format!(
        "❌ Hisobotni yaratib bo'lmadi: {}\nIltimos, sotuvni boshidan qayta kiriting.",
        escape_html(reason)
    )
}

pub fn lookup_failed(reason: &str) -> String {
    format!(
        "⚠️ Katalogdan o'qishda xatolik: {}\nBosh menyuga qaytildi.",
        escape_html(reason)
    )
}
