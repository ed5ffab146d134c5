//! Platform windows behind the overlay: the layered text window and the
//! small close-button satellite next to it.

use super::compositor::FrameBuffer;
use super::geometry::{Point, Rect};

/// Pointer activity captured by the overlay window while it accepts
/// input. Cursor positions are in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    LeftDown { cursor: Point },
    Move { cursor: Point },
    LeftUp { cursor: Point },
}

/// The main overlay surface. The controller drives it; implementations
/// only talk to the window system.
pub trait OverlayView {
    /// Push a composed frame and place the window at `rect`.
    fn set_frame(&mut self, frame: &FrameBuffer, rect: Rect);
    /// Move without re-pushing the current frame.
    fn move_to(&mut self, position: Point);
    /// Toggle click-through. Transparent windows never see the pointer.
    fn set_input_transparent(&mut self, transparent: bool);
    fn show(&mut self);
    fn hide(&mut self);
    fn ensure_topmost(&mut self);
    /// Switch between the arrow and the move cursor while interactive.
    fn set_move_cursor(&mut self, enabled: bool);
    fn drain_pointer_events(&mut self) -> Vec<PointerEvent>;
}

/// The close-button window that trails the overlay while interactive.
pub trait SatelliteView {
    fn show_at(&mut self, rect: Rect);
    fn hide(&mut self);
    fn ensure_topmost(&mut self);
    /// True when the button was clicked since the last call.
    fn take_clicked(&mut self) -> bool;
}

#[cfg(windows)]
pub use platform::{pump_messages, CloseButtonWindow, OverlayWindow};

#[cfg(windows)]
mod platform {
    use super::{OverlayView, PointerEvent, SatelliteView};
    use crate::overlay::compositor::FrameBuffer;
    use crate::overlay::geometry::{Point, Rect};
    use anyhow::{Context, Result};
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::mem;
    use std::ptr;
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Mutex, Once};
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{
        COLORREF, HANDLE, HWND, LPARAM, LRESULT, POINT, RECT, SIZE, WPARAM,
    };
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreateCompatibleDC, CreateDIBSection, CreatePen, CreateSolidBrush, DeleteDC,
        DeleteObject, Ellipse, EndPaint, FillRect, GetDC, GetStockObject, InvalidateRect, LineTo,
        MoveToEx, ReleaseDC, SelectObject, AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO,
        BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION, DIB_RGB_COLORS, NULL_PEN, PAINTSTRUCT, PS_SOLID,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        ReleaseCapture, SetCapture, TrackMouseEvent, TME_LEAVE, TRACKMOUSEEVENT,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
        GetCursorPos, GetWindowLongW, LoadCursorW, PeekMessageW, RegisterClassW, SetCursor,
        SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindow, TranslateMessage,
        UpdateLayeredWindow, GWL_EXSTYLE, HWND_TOPMOST, IDC_ARROW, IDC_HAND, IDC_SIZEALL,
        LWA_COLORKEY, MSG, PM_REMOVE, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
        SWP_NOZORDER, SWP_SHOWWINDOW, SW_HIDE, SW_SHOWNOACTIVATE, ULW_ALPHA, WM_ACTIVATE,
        WM_ERASEBKGND, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSELEAVE, WM_MOUSEMOVE, WM_PAINT,
        WM_QUIT, WM_SETCURSOR, WM_SHOWWINDOW, WNDCLASSW, WS_EX_LAYERED,
        WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
    };

    static POINTER_SENDERS: Lazy<Mutex<HashMap<isize, Sender<PointerEvent>>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));
    static MOVE_CURSOR: Lazy<Mutex<HashMap<isize, bool>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));
    static CLICK_SENDERS: Lazy<Mutex<HashMap<isize, Sender<()>>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));
    static HOVER_STATE: Lazy<Mutex<HashMap<isize, bool>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));

    const OVERLAY_CLASS: PCWSTR = w!("temp_hud_overlay");
    const CLOSE_BUTTON_CLASS: PCWSTR = w!("temp_hud_close_button");

    fn colorref(r: u8, g: u8, b: u8) -> COLORREF {
        COLORREF((r as u32) | ((g as u32) << 8) | ((b as u32) << 16))
    }

    /// Colorkey for the close button; any pixel in this color stays
    /// fully transparent.
    fn transparency_colorkey() -> COLORREF {
        colorref(255, 0, 255)
    }

    fn reassert_topmost(hwnd: HWND) {
        unsafe {
            let _ = SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            );
        }
    }

    fn set_system_cursor(name: PCWSTR) {
        unsafe {
            if let Ok(cursor) = LoadCursorW(None, name) {
                SetCursor(cursor);
            }
        }
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_ERASEBKGND => LRESULT(1),
            // Not WM_WINDOWPOSCHANGED: SetWindowPos sends it synchronously,
            // so reasserting from there would recurse.
            WM_SHOWWINDOW | WM_ACTIVATE => {
                reassert_topmost(hwnd);
                unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
            }
            WM_SETCURSOR => {
                let move_cursor = MOVE_CURSOR
                    .lock()
                    .ok()
                    .and_then(|cursors| cursors.get(&(hwnd.0 as isize)).copied())
                    .unwrap_or(false);
                set_system_cursor(if move_cursor { IDC_SIZEALL } else { IDC_ARROW });
                LRESULT(1)
            }
            WM_LBUTTONDOWN | WM_MOUSEMOVE | WM_LBUTTONUP => {
                if msg == WM_LBUTTONDOWN {
                    let _ = unsafe { SetCapture(hwnd) };
                } else if msg == WM_LBUTTONUP {
                    unsafe {
                        let _ = ReleaseCapture();
                    }
                }

                let mut cursor = POINT::default();
                if unsafe { GetCursorPos(&mut cursor) }.is_ok() {
                    let cursor = Point::new(cursor.x, cursor.y);
                    if let Ok(senders) = POINTER_SENDERS.lock() {
                        if let Some(tx) = senders.get(&(hwnd.0 as isize)) {
                            let event = match msg {
                                WM_LBUTTONDOWN => PointerEvent::LeftDown { cursor },
                                WM_MOUSEMOVE => PointerEvent::Move { cursor },
                                WM_LBUTTONUP => PointerEvent::LeftUp { cursor },
                                _ => unreachable!(),
                            };
                            let _ = tx.send(event);
                        }
                    }
                }
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    /// Borderless layered popup carrying the overlay text. Input
    /// transparency is toggled by flipping `WS_EX_TRANSPARENT`.
    pub struct OverlayWindow {
        hwnd: HWND,
        input_transparent: bool,
        pointer_rx: Receiver<PointerEvent>,
    }

    impl OverlayWindow {
        pub fn create() -> Result<Self> {
            static REGISTER_CLASS: Once = Once::new();
            let hinstance =
                unsafe { GetModuleHandleW(None) }.context("module handle unavailable")?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: OVERLAY_CLASS,
                    lpfnWndProc: Some(overlay_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_LAYERED
                        | WS_EX_TRANSPARENT
                        | WS_EX_TOPMOST
                        | WS_EX_TOOLWINDOW
                        | WS_EX_NOACTIVATE,
                    OVERLAY_CLASS,
                    PCWSTR::null(),
                    WS_POPUP,
                    0,
                    0,
                    1,
                    1,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .context("overlay window creation failed")?;

            let (pointer_tx, pointer_rx) = channel::<PointerEvent>();
            if let Ok(mut senders) = POINTER_SENDERS.lock() {
                senders.insert(hwnd.0 as isize, pointer_tx);
            }
            if let Ok(mut cursors) = MOVE_CURSOR.lock() {
                cursors.insert(hwnd.0 as isize, false);
            }

            Ok(Self {
                hwnd,
                input_transparent: true,
                pointer_rx,
            })
        }

        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }
    }

    impl OverlayView for OverlayWindow {
        fn set_frame(&mut self, frame: &FrameBuffer, rect: Rect) {
            if frame.width <= 0 || frame.height <= 0 {
                return;
            }
            unsafe {
                let screen_dc = GetDC(HWND::default());
                if screen_dc.0.is_null() {
                    return;
                }
                let mem_dc = CreateCompatibleDC(screen_dc);
                if mem_dc.0.is_null() {
                    let _ = ReleaseDC(HWND::default(), screen_dc);
                    return;
                }

                let mut bmi = BITMAPINFO::default();
                bmi.bmiHeader = BITMAPINFOHEADER {
                    biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: frame.width,
                    biHeight: -frame.height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                };
                let mut bits: *mut core::ffi::c_void = ptr::null_mut();
                let dib = match CreateDIBSection(
                    mem_dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    HANDLE::default(),
                    0,
                ) {
                    Ok(dib) => dib,
                    Err(error) => {
                        tracing::warn!(%error, "frame bitmap allocation failed");
                        let _ = DeleteDC(mem_dc);
                        let _ = ReleaseDC(HWND::default(), screen_dc);
                        return;
                    }
                };

                if !bits.is_null() {
                    let pixels = std::slice::from_raw_parts_mut(
                        bits as *mut u32,
                        (frame.width * frame.height) as usize,
                    );
                    pixels.copy_from_slice(&frame.pixels);

                    let old_bitmap = SelectObject(mem_dc, dib);
                    let dest = POINT {
                        x: rect.x,
                        y: rect.y,
                    };
                    let size = SIZE {
                        cx: frame.width,
                        cy: frame.height,
                    };
                    let src = POINT { x: 0, y: 0 };
                    let blend = BLENDFUNCTION {
                        BlendOp: AC_SRC_OVER as u8,
                        BlendFlags: 0,
                        SourceConstantAlpha: 255,
                        AlphaFormat: AC_SRC_ALPHA as u8,
                    };
                    if let Err(error) = UpdateLayeredWindow(
                        self.hwnd,
                        screen_dc,
                        Some(&dest),
                        Some(&size),
                        mem_dc,
                        Some(&src),
                        COLORREF(0),
                        Some(&blend),
                        ULW_ALPHA,
                    ) {
                        tracing::warn!(%error, "layered window update failed");
                    }
                    let _ = SelectObject(mem_dc, old_bitmap);
                }

                let _ = DeleteObject(dib);
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(HWND::default(), screen_dc);
            }
        }

        fn move_to(&mut self, position: Point) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND::default(),
                    position.x,
                    position.y,
                    0,
                    0,
                    SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
                );
            }
        }

        fn set_input_transparent(&mut self, transparent: bool) {
            if self.input_transparent == transparent {
                return;
            }
            self.input_transparent = transparent;
            unsafe {
                let mut ex_style = GetWindowLongW(self.hwnd, GWL_EXSTYLE);
                if transparent {
                    ex_style |= WS_EX_TRANSPARENT.0 as i32;
                } else {
                    ex_style &= !(WS_EX_TRANSPARENT.0 as i32);
                }
                let _ = SetWindowLongW(self.hwnd, GWL_EXSTYLE, ex_style);
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND::default(),
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE | SWP_FRAMECHANGED,
                );
            }
        }

        fn show(&mut self) {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
            }
            reassert_topmost(self.hwnd);
        }

        fn hide(&mut self) {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_HIDE);
            }
        }

        fn ensure_topmost(&mut self) {
            reassert_topmost(self.hwnd);
        }

        fn set_move_cursor(&mut self, enabled: bool) {
            if let Ok(mut cursors) = MOVE_CURSOR.lock() {
                cursors.insert(self.hwnd.0 as isize, enabled);
            }
        }

        fn drain_pointer_events(&mut self) -> Vec<PointerEvent> {
            let mut events = Vec::new();
            loop {
                match self.pointer_rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            events
        }
    }

    impl Drop for OverlayWindow {
        fn drop(&mut self) {
            if let Ok(mut senders) = POINTER_SENDERS.lock() {
                senders.remove(&(self.hwnd.0 as isize));
            }
            if let Ok(mut cursors) = MOVE_CURSOR.lock() {
                cursors.remove(&(self.hwnd.0 as isize));
            }
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }

    unsafe extern "system" fn close_button_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_ERASEBKGND => LRESULT(1),
            WM_SHOWWINDOW | WM_ACTIVATE => {
                reassert_topmost(hwnd);
                unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
            }
            WM_SETCURSOR => {
                set_system_cursor(IDC_HAND);
                LRESULT(1)
            }
            WM_MOUSEMOVE => {
                let newly_hovered = HOVER_STATE
                    .lock()
                    .map(|mut hover| {
                        !std::mem::replace(hover.entry(hwnd.0 as isize).or_insert(false), true)
                    })
                    .unwrap_or(false);
                if newly_hovered {
                    let mut track = TRACKMOUSEEVENT {
                        cbSize: mem::size_of::<TRACKMOUSEEVENT>() as u32,
                        dwFlags: TME_LEAVE,
                        hwndTrack: hwnd,
                        dwHoverTime: 0,
                    };
                    unsafe {
                        let _ = TrackMouseEvent(&mut track);
                        let _ = InvalidateRect(hwnd, None, false);
                    }
                }
                LRESULT(0)
            }
            WM_MOUSELEAVE => {
                if let Ok(mut hover) = HOVER_STATE.lock() {
                    hover.insert(hwnd.0 as isize, false);
                }
                unsafe {
                    let _ = InvalidateRect(hwnd, None, false);
                }
                LRESULT(0)
            }
            WM_LBUTTONUP => {
                if let Ok(senders) = CLICK_SENDERS.lock() {
                    if let Some(tx) = senders.get(&(hwnd.0 as isize)) {
                        let _ = tx.send(());
                    }
                }
                LRESULT(0)
            }
            WM_PAINT => {
                let hovered = HOVER_STATE
                    .lock()
                    .ok()
                    .and_then(|hover| hover.get(&(hwnd.0 as isize)).copied())
                    .unwrap_or(false);
                unsafe { paint_close_button(hwnd, hovered) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    unsafe fn paint_close_button(hwnd: HWND, hovered: bool) {
        let mut paint = PAINTSTRUCT::default();
        let hdc = unsafe { BeginPaint(hwnd, &mut paint) };
        if hdc.0.is_null() {
            return;
        }
        let mut client = RECT::default();
        if unsafe { GetClientRect(hwnd, &mut client) }.is_err() {
            unsafe {
                let _ = EndPaint(hwnd, &paint);
            }
            return;
        }

        let (fill, cross) = if hovered {
            (colorref(220, 32, 32), colorref(255, 255, 255))
        } else {
            (colorref(255, 255, 255), colorref(0, 0, 0))
        };

        unsafe {
            // Colorkeyed background, then the disc and cross on top.
            let background = CreateSolidBrush(transparency_colorkey());
            FillRect(hdc, &client, background);
            let _ = DeleteObject(background);

            let disc = CreateSolidBrush(fill);
            let old_brush = SelectObject(hdc, disc);
            let old_pen = SelectObject(hdc, GetStockObject(NULL_PEN));
            let _ = Ellipse(hdc, 0, 0, client.right - 1, client.bottom - 1);
            let _ = SelectObject(hdc, old_pen);
            let _ = SelectObject(hdc, old_brush);
            let _ = DeleteObject(disc);

            let width = (client.right - client.left).max(1);
            let inset = (width / 4).max(2);
            let stroke = (width / 7).max(1);
            let pen = CreatePen(PS_SOLID, stroke, cross);
            let old_pen = SelectObject(hdc, pen);
            let _ = MoveToEx(hdc, inset, inset, None);
            let _ = LineTo(hdc, client.right - 1 - inset, client.bottom - 1 - inset);
            let _ = MoveToEx(hdc, client.right - 1 - inset, inset, None);
            let _ = LineTo(hdc, inset, client.bottom - 1 - inset);
            let _ = SelectObject(hdc, old_pen);
            let _ = DeleteObject(pen);

            let _ = EndPaint(hwnd, &paint);
        }
    }

    /// Colorkeyed topmost popup drawing the close disc. Clicks are
    /// drained through [`SatelliteView::take_clicked`].
    pub struct CloseButtonWindow {
        hwnd: HWND,
        clicked_rx: Receiver<()>,
    }

    impl CloseButtonWindow {
        pub fn create() -> Result<Self> {
            static REGISTER_CLASS: Once = Once::new();
            let hinstance =
                unsafe { GetModuleHandleW(None) }.context("module handle unavailable")?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: CLOSE_BUTTON_CLASS,
                    lpfnWndProc: Some(close_button_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                    CLOSE_BUTTON_CLASS,
                    PCWSTR::null(),
                    WS_POPUP,
                    0,
                    0,
                    1,
                    1,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .context("close button window creation failed")?;

            if let Err(error) =
                unsafe { SetLayeredWindowAttributes(hwnd, transparency_colorkey(), 0, LWA_COLORKEY) }
            {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(error).context("close button transparency setup failed");
            }

            let (clicked_tx, clicked_rx) = channel::<()>();
            if let Ok(mut senders) = CLICK_SENDERS.lock() {
                senders.insert(hwnd.0 as isize, clicked_tx);
            }
            if let Ok(mut hover) = HOVER_STATE.lock() {
                hover.insert(hwnd.0 as isize, false);
            }

            Ok(Self { hwnd, clicked_rx })
        }

        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }
    }

    impl SatelliteView for CloseButtonWindow {
        fn show_at(&mut self, rect: Rect) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    SWP_NOACTIVATE | SWP_SHOWWINDOW,
                );
                let _ = InvalidateRect(self.hwnd, None, false);
            }
        }

        fn hide(&mut self) {
            if let Ok(mut hover) = HOVER_STATE.lock() {
                hover.insert(self.hwnd.0 as isize, false);
            }
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_HIDE);
            }
        }

        fn ensure_topmost(&mut self) {
            reassert_topmost(self.hwnd);
        }

        fn take_clicked(&mut self) -> bool {
            let mut clicked = false;
            loop {
                match self.clicked_rx.try_recv() {
                    Ok(()) => clicked = true,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            clicked
        }
    }

    impl Drop for CloseButtonWindow {
        fn drop(&mut self) {
            if let Ok(mut senders) = CLICK_SENDERS.lock() {
                senders.remove(&(self.hwnd.0 as isize));
            }
            if let Ok(mut hover) = HOVER_STATE.lock() {
                hover.remove(&(self.hwnd.0 as isize));
            }
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }

    /// Drain the thread's message queue. Returns false once `WM_QUIT`
    /// arrives.
    pub fn pump_messages() -> bool {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    return false;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        true
    }
}
