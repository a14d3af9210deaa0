//! User-facing texts injected into conversations as assistant messages.

pub const INSUFFICIENT_BALANCE: &str =
    "موجودی سکه شما برای ارسال پیام کافی نیست. لطفاً حساب خود را از طریق پروفایل شارژ کنید.";

pub const GENERIC_FAILURE: &str = "متاسفانه خطایی رخ داد. لطفا دوباره تلاش کنید.";

pub const SAFETY_BLOCKED: &str =
    "پاسخ به دلیل تنظیمات ایمنی مسدود شد. می‌توانید «سطح ایمنی» را در تنظیمات پیشرفته تغییر دهید.";
